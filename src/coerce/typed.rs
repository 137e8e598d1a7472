use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::{CoerceOptions, FloatWidth, IntWidth, TargetKind, TargetType, convert};
use crate::types::RowValues;

/// A Rust type with a known coercion target.
///
/// `from_value` receives a value already converted to [`Self::target_type`],
/// so implementations only unwrap the expected variant.
pub trait Coercible: Sized {
    fn target_type() -> TargetType;

    fn from_value(value: RowValues) -> Self;

    fn to_value(&self) -> RowValues;
}

/// Coerce `value` straight into `T`.
#[must_use]
pub fn coerce<T: Coercible>(value: &RowValues, options: &CoerceOptions) -> T {
    T::from_value(convert(value, &T::target_type(), options))
}

macro_rules! coercible_int {
    ($($ty:ty => $width:ident),* $(,)?) => {$(
        impl Coercible for $ty {
            fn target_type() -> TargetType {
                TargetType::new(TargetKind::Integer(IntWidth::$width))
            }

            fn from_value(value: RowValues) -> Self {
                match value {
                    RowValues::Int(i) => <$ty>::try_from(i).unwrap_or_default(),
                    _ => <$ty>::default(),
                }
            }

            fn to_value(&self) -> RowValues {
                i64::try_from(*self).map_or(RowValues::Null, RowValues::Int)
            }
        }
    )*};
}

coercible_int!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
);

impl Coercible for f64 {
    fn target_type() -> TargetType {
        TargetType::new(TargetKind::Float(FloatWidth::F64))
    }

    fn from_value(value: RowValues) -> Self {
        value.as_float().unwrap_or_default()
    }

    fn to_value(&self) -> RowValues {
        RowValues::Float(*self)
    }
}

impl Coercible for f32 {
    fn target_type() -> TargetType {
        TargetType::new(TargetKind::Float(FloatWidth::F32))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: RowValues) -> Self {
        value.as_float().map_or(0.0, |f| f as f32)
    }

    fn to_value(&self) -> RowValues {
        RowValues::Float(f64::from(*self))
    }
}

impl Coercible for bool {
    fn target_type() -> TargetType {
        TargetType::new(TargetKind::Bool)
    }

    fn from_value(value: RowValues) -> Self {
        matches!(value, RowValues::Bool(true))
    }

    fn to_value(&self) -> RowValues {
        RowValues::Bool(*self)
    }
}

impl Coercible for String {
    fn target_type() -> TargetType {
        TargetType::new(TargetKind::Text)
    }

    fn from_value(value: RowValues) -> Self {
        match value {
            RowValues::Text(text) => text,
            _ => String::new(),
        }
    }

    fn to_value(&self) -> RowValues {
        RowValues::Text(self.clone())
    }
}

impl Coercible for NaiveDateTime {
    fn target_type() -> TargetType {
        TargetType::new(TargetKind::DateTime)
    }

    fn from_value(value: RowValues) -> Self {
        value.as_timestamp().unwrap_or_default()
    }

    fn to_value(&self) -> RowValues {
        RowValues::Timestamp(*self)
    }
}

impl Coercible for NaiveDate {
    fn target_type() -> TargetType {
        TargetType::new(TargetKind::Date)
    }

    fn from_value(value: RowValues) -> Self {
        value
            .as_timestamp()
            .map(|ts| ts.date())
            .unwrap_or_default()
    }

    fn to_value(&self) -> RowValues {
        RowValues::Timestamp(self.and_time(NaiveTime::MIN))
    }
}

impl Coercible for Vec<u8> {
    fn target_type() -> TargetType {
        TargetType::new(TargetKind::Bytes)
    }

    fn from_value(value: RowValues) -> Self {
        match value {
            RowValues::Blob(bytes) => bytes,
            _ => Vec::new(),
        }
    }

    fn to_value(&self) -> RowValues {
        RowValues::Blob(self.clone())
    }
}

impl Coercible for serde_json::Value {
    fn target_type() -> TargetType {
        TargetType::new(TargetKind::Json)
    }

    fn from_value(value: RowValues) -> Self {
        match value {
            RowValues::JSON(json) => json,
            _ => serde_json::Value::Null,
        }
    }

    fn to_value(&self) -> RowValues {
        RowValues::JSON(self.clone())
    }
}

impl<T: Coercible> Coercible for Option<T> {
    fn target_type() -> TargetType {
        T::target_type().as_nullable()
    }

    fn from_value(value: RowValues) -> Self {
        if value.is_null() {
            None
        } else {
            Some(T::from_value(value))
        }
    }

    fn to_value(&self) -> RowValues {
        self.as_ref().map_or(RowValues::Null, Coercible::to_value)
    }
}

/// Make a fieldless enum [`Coercible`]. Members are matched by name, by name
/// ignoring case, or by discriminant; the first listed variant is the default.
///
/// ```rust
/// use sql_entity::coerce::{coerce, CoerceOptions};
/// use sql_entity::impl_coercible_enum;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// enum Status {
///     #[default]
///     Active = 1,
///     Closed = 9,
/// }
/// impl_coercible_enum!(Status { Active, Closed });
///
/// let opts = CoerceOptions::default();
/// assert_eq!(coerce::<Status>(&"closed".into(), &opts), Status::Closed);
/// assert_eq!(coerce::<Status>(&9i64.into(), &opts), Status::Closed);
/// assert_eq!(coerce::<Option<Status>>(&"Archived".into(), &opts), None);
/// ```
#[macro_export]
macro_rules! impl_coercible_enum {
    ($ty:ident { $first:ident $(, $rest:ident)* $(,)? }) => {
        impl $crate::coerce::Coercible for $ty {
            fn target_type() -> $crate::coerce::TargetType {
                const MEMBERS: &[(&str, i64)] = &[
                    (stringify!($first), $ty::$first as i64),
                    $((stringify!($rest), $ty::$rest as i64),)*
                ];
                $crate::coerce::TargetType::new($crate::coerce::TargetKind::Enum(MEMBERS))
            }

            fn from_value(value: $crate::RowValues) -> Self {
                match value.as_text().unwrap_or_default() {
                    $(stringify!($rest) => $ty::$rest,)*
                    _ => $ty::$first,
                }
            }

            fn to_value(&self) -> $crate::RowValues {
                let name = match self {
                    $ty::$first => stringify!($first),
                    $($ty::$rest => stringify!($rest),)*
                };
                $crate::RowValues::Text(name.to_owned())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::Locale;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Shift {
        Morning = 1,
        Evening = 2,
        Night = 3,
    }
    crate::impl_coercible_enum!(Shift { Morning, Evening, Night });

    #[test]
    fn typed_integers_respect_width() {
        let opts = CoerceOptions::default();
        assert_eq!(coerce::<i8>(&RowValues::Int(120), &opts), 120);
        assert_eq!(coerce::<i8>(&RowValues::Int(300), &opts), 0);
        assert_eq!(coerce::<Option<u8>>(&RowValues::Int(-1), &opts), None);
    }

    #[test]
    fn empty_string_to_option_is_none_and_to_int_is_zero() {
        let opts = CoerceOptions::default();
        let empty = RowValues::Text(String::new());
        assert_eq!(coerce::<Option<i32>>(&empty, &opts), None);
        assert_eq!(coerce::<i32>(&empty, &opts), 0);
    }

    #[test]
    fn localized_float_text() {
        let opts = CoerceOptions::default().with_locale(Locale::ID_ID);
        assert_eq!(
            coerce::<f64>(&RowValues::Text("1.234,5".into()), &opts),
            1234.5
        );
    }

    #[test]
    fn enum_round_trips_through_text() {
        let opts = CoerceOptions::default();
        assert_eq!(
            coerce::<Shift>(&RowValues::Text("night".into()), &opts),
            Shift::Night
        );
        assert_eq!(coerce::<Shift>(&RowValues::Int(2), &opts), Shift::Evening);
        assert_eq!(coerce::<Shift>(&RowValues::Int(7), &opts), Shift::Morning);
        assert_eq!(Shift::Evening.to_value(), RowValues::Text("Evening".into()));
    }

    #[test]
    fn option_to_value_maps_none_to_null() {
        assert_eq!(None::<String>.to_value(), RowValues::Null);
        assert_eq!(Some(5i32).to_value(), RowValues::Int(5));
    }
}

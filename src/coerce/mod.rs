//! Best-effort conversion of loosely-typed values into a declared target type.
//!
//! Conversion never fails: anything that cannot be converted becomes the
//! target's default (zero, empty, epoch, first enum member) or `Null` when
//! the target is nullable. Use [`convert_reported`] to find out which of
//! those happened.
//!
//! ```rust
//! use sql_entity::coerce::{self, CoerceOptions, Locale};
//!
//! let opts = CoerceOptions::default().with_locale(Locale::ID_ID);
//! let amount: f64 = coerce::coerce(&"Rp 12.500,75".into(), &opts);
//! assert_eq!(amount, 12500.75);
//!
//! let missing: Option<i32> = coerce::coerce(&"".into(), &opts);
//! assert_eq!(missing, None);
//! ```

mod datetime;
mod locale;
mod numeric;
mod typed;

use std::fmt::Write as _;

use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};

pub use locale::Locale;
pub use typed::{Coercible, coerce};

use crate::types::RowValues;

/// Storage width of an integer target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    /// Whether `value` fits this width. `U64` is limited to the non-negative
    /// half of `i64`, since values travel as `RowValues::Int`.
    #[must_use]
    pub fn contains(self, value: i64) -> bool {
        let (min, max) = match self {
            IntWidth::I8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
            IntWidth::I16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            IntWidth::I32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
            IntWidth::I64 => (i64::MIN, i64::MAX),
            IntWidth::U8 => (0, i64::from(u8::MAX)),
            IntWidth::U16 => (0, i64::from(u16::MAX)),
            IntWidth::U32 => (0, i64::from(u32::MAX)),
            IntWidth::U64 => (0, i64::MAX),
        };
        (min..=max).contains(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

/// The shape a value is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Integer(IntWidth),
    Float(FloatWidth),
    Bool,
    DateTime,
    /// Date without time of day; carried as a midnight timestamp.
    Date,
    Text,
    /// Enumeration given as `(name, discriminant)` pairs. The first member
    /// is the default.
    Enum(&'static [(&'static str, i64)]),
    Bytes,
    Json,
}

impl TargetKind {
    /// Scalar kinds are the ones that appear in column mappings.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, TargetKind::Bytes | TargetKind::Json)
    }
}

/// A [`TargetKind`] plus whether `Null` is an acceptable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetType {
    pub kind: TargetKind,
    pub nullable: bool,
}

impl TargetType {
    #[must_use]
    pub const fn new(kind: TargetKind) -> Self {
        TargetType {
            kind,
            nullable: false,
        }
    }

    #[must_use]
    pub const fn nullable(kind: TargetKind) -> Self {
        TargetType {
            kind,
            nullable: true,
        }
    }

    #[must_use]
    pub const fn as_nullable(self) -> Self {
        TargetType {
            kind: self.kind,
            nullable: true,
        }
    }

    /// The value conversion falls back to.
    #[must_use]
    pub fn default_value(&self) -> RowValues {
        if self.nullable {
            return RowValues::Null;
        }
        match self.kind {
            TargetKind::Integer(_) => RowValues::Int(0),
            TargetKind::Float(_) => RowValues::Float(0.0),
            TargetKind::Bool => RowValues::Bool(false),
            TargetKind::DateTime | TargetKind::Date => {
                RowValues::Timestamp(NaiveDateTime::default())
            }
            TargetKind::Text => RowValues::Text(String::new()),
            TargetKind::Enum(members) => members
                .first()
                .map_or(RowValues::Null, |(name, _)| RowValues::Text((*name).to_owned())),
            TargetKind::Bytes => RowValues::Blob(Vec::new()),
            TargetKind::Json => RowValues::JSON(serde_json::Value::Null),
        }
    }
}

/// Knobs for a single conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoerceOptions {
    /// Treat numeric input for date targets as spreadsheet serial days.
    pub excel_date: bool,
    /// chrono format tried before any locale pattern; also used when
    /// rendering timestamps as text.
    pub date_format: Option<String>,
    /// Active locale; `None` means [`Locale::EN_US`].
    pub locale: Option<Locale>,
}

impl CoerceOptions {
    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_excel_date(mut self, excel_date: bool) -> Self {
        self.excel_date = excel_date;
        self
    }

    /// The locale conversions run under.
    #[must_use]
    pub fn active_locale(&self) -> Locale {
        self.locale.unwrap_or_default()
    }
}

/// What [`convert_reported`] did to reach its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoercionOutcome {
    /// The input already had the target's shape.
    Unchanged,
    /// The input was converted (including null-like input to `Null`).
    Converted,
    /// Conversion failed and the target's default was returned.
    Defaulted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coercion {
    pub value: RowValues,
    pub outcome: CoercionOutcome,
}

/// Convert `value` into `target`. Never fails.
#[must_use]
pub fn convert(value: &RowValues, target: &TargetType, options: &CoerceOptions) -> RowValues {
    convert_reported(value, target, options).value
}

/// Convert `value` into `target`, reporting whether the default was used.
#[must_use]
pub fn convert_reported(
    value: &RowValues,
    target: &TargetType,
    options: &CoerceOptions,
) -> Coercion {
    if value.is_null_like() {
        return if target.nullable {
            Coercion {
                value: RowValues::Null,
                outcome: if value.is_null() {
                    CoercionOutcome::Unchanged
                } else {
                    CoercionOutcome::Converted
                },
            }
        } else {
            Coercion {
                value: target.default_value(),
                outcome: CoercionOutcome::Defaulted,
            }
        };
    }

    let locale = options.active_locale();
    let converted = match target.kind {
        TargetKind::Integer(width) => numeric::to_integer(value, width, &locale),
        TargetKind::Float(width) => numeric::to_float(value, width, &locale),
        TargetKind::Bool => numeric::to_bool(value).map(RowValues::Bool),
        TargetKind::DateTime => datetime::to_datetime(
            value,
            options.excel_date,
            options.date_format.as_deref(),
            &locale,
        )
        .map(RowValues::Timestamp),
        TargetKind::Date => datetime::to_datetime(
            value,
            options.excel_date,
            options.date_format.as_deref(),
            &locale,
        )
        .map(|ts| RowValues::Timestamp(ts.date().and_time(chrono::NaiveTime::MIN))),
        TargetKind::Text => to_text(value, options, &locale).map(RowValues::Text),
        TargetKind::Enum(members) => to_enum(value, members),
        TargetKind::Bytes => to_bytes(value),
        TargetKind::Json => to_json(value),
    };

    match converted {
        Some(result) => {
            let outcome = if &result == value {
                CoercionOutcome::Unchanged
            } else {
                CoercionOutcome::Converted
            };
            Coercion {
                value: result,
                outcome,
            }
        }
        None => {
            tracing::trace!(
                source = value.type_name(),
                target = ?target.kind,
                "coercion fell back to default"
            );
            Coercion {
                value: target.default_value(),
                outcome: CoercionOutcome::Defaulted,
            }
        }
    }
}

/// Render `ts` with a chrono pattern; `None` when the pattern is invalid or
/// asks for fields a naive timestamp lacks.
fn render_timestamp(ts: &NaiveDateTime, pattern: &str) -> Option<String> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", ts.format(pattern)).ok()?;
    Some(out)
}

fn to_text(value: &RowValues, options: &CoerceOptions, locale: &Locale) -> Option<String> {
    let text = match value {
        RowValues::Text(text) => text.clone(),
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => locale.format_float(*f),
        RowValues::Bool(b) => b.to_string(),
        RowValues::Timestamp(ts) => {
            return options
                .date_format
                .as_deref()
                .and_then(|pattern| render_timestamp(ts, pattern))
                .or_else(|| render_timestamp(ts, locale.display_pattern()))
                .or_else(|| render_timestamp(ts, Locale::reference().display_pattern()));
        }
        RowValues::JSON(serde_json::Value::String(s)) => s.clone(),
        RowValues::JSON(json) => json.to_string(),
        RowValues::Blob(bytes) => hex(bytes),
        RowValues::Null => String::new(),
    };
    Some(text)
}

/// Lowercase hex rendering of a byte string.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

/// Match by exact name, then by name ignoring case, then by discriminant.
fn to_enum(value: &RowValues, members: &'static [(&'static str, i64)]) -> Option<RowValues> {
    let by_discriminant = |d: i64| members.iter().find(|(_, v)| *v == d);
    let found = match value {
        RowValues::Text(text) => {
            let text = text.trim();
            members
                .iter()
                .find(|(name, _)| *name == text)
                .or_else(|| members.iter().find(|(name, _)| name.eq_ignore_ascii_case(text)))
                .or_else(|| text.parse::<i64>().ok().and_then(by_discriminant))
        }
        RowValues::Int(i) => by_discriminant(*i),
        #[allow(clippy::cast_possible_truncation)]
        RowValues::Float(f) if f.fract() == 0.0 => by_discriminant(*f as i64),
        RowValues::JSON(serde_json::Value::String(s)) => {
            return to_enum(&RowValues::Text(s.clone()), members);
        }
        RowValues::JSON(json) => json.as_i64().and_then(by_discriminant),
        _ => None,
    };
    found.map(|(name, _)| RowValues::Text((*name).to_owned()))
}

fn to_bytes(value: &RowValues) -> Option<RowValues> {
    match value {
        RowValues::Blob(bytes) => Some(RowValues::Blob(bytes.clone())),
        RowValues::Text(text) => Some(RowValues::Blob(text.clone().into_bytes())),
        RowValues::JSON(json) => serde_json::to_vec(json).ok().map(RowValues::Blob),
        _ => None,
    }
}

fn to_json(value: &RowValues) -> Option<RowValues> {
    let json = match value {
        RowValues::JSON(json) => json.clone(),
        RowValues::Text(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.clone())),
        RowValues::Int(i) => serde_json::Value::from(*i),
        RowValues::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number)?,
        RowValues::Bool(b) => serde_json::Value::Bool(*b),
        RowValues::Timestamp(ts) => serde_json::to_value(ts).ok()?,
        RowValues::Blob(bytes) => serde_json::Value::from(bytes.clone()),
        RowValues::Null => serde_json::Value::Null,
    };
    Some(RowValues::JSON(json))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const STATUS: &[(&str, i64)] = &[("Active", 1), ("Suspended", 2), ("Closed", 9)];

    fn opts() -> CoerceOptions {
        CoerceOptions::default()
    }

    #[test]
    fn empty_text_is_null_for_nullable_and_zero_otherwise() {
        let empty = RowValues::Text(String::new());
        let int32 = TargetKind::Integer(IntWidth::I32);
        assert_eq!(
            convert(&empty, &TargetType::nullable(int32), &opts()),
            RowValues::Null
        );
        let report = convert_reported(&empty, &TargetType::new(int32), &opts());
        assert_eq!(report.value, RowValues::Int(0));
        assert_eq!(report.outcome, CoercionOutcome::Defaulted);
    }

    #[test]
    fn literal_null_text_is_null_like() {
        let target = TargetType::nullable(TargetKind::Text);
        assert_eq!(
            convert(&RowValues::Text(" NULL ".into()), &target, &opts()),
            RowValues::Null
        );
    }

    #[test]
    fn matching_source_is_unchanged() {
        let report = convert_reported(
            &RowValues::Int(42),
            &TargetType::new(TargetKind::Integer(IntWidth::I64)),
            &opts(),
        );
        assert_eq!(report.value, RowValues::Int(42));
        assert_eq!(report.outcome, CoercionOutcome::Unchanged);
    }

    #[test]
    fn grouped_decimals_depend_on_locale() {
        let target = TargetType::new(TargetKind::Float(FloatWidth::F64));
        let text = RowValues::Text("12,500.75".into());
        assert_eq!(convert(&text, &target, &opts()), RowValues::Float(12500.75));
        assert_eq!(
            convert(&text, &target, &opts().with_locale(Locale::ID_ID)),
            RowValues::Float(12.50075)
        );
    }

    #[test]
    fn unparseable_integer_text_defaults() {
        let report = convert_reported(
            &RowValues::Text("n/a".into()),
            &TargetType::new(TargetKind::Integer(IntWidth::I32)),
            &opts(),
        );
        assert_eq!(report.value, RowValues::Int(0));
        assert_eq!(report.outcome, CoercionOutcome::Defaulted);
    }

    #[test]
    fn enum_matches_name_case_and_discriminant() {
        let target = TargetType::new(TargetKind::Enum(STATUS));
        let name = |v: &str| convert(&RowValues::Text(v.into()), &target, &opts());
        assert_eq!(name("Suspended"), RowValues::Text("Suspended".into()));
        assert_eq!(name("closed"), RowValues::Text("Closed".into()));
        assert_eq!(name("2"), RowValues::Text("Suspended".into()));
        assert_eq!(
            convert(&RowValues::Int(9), &target, &opts()),
            RowValues::Text("Closed".into())
        );
    }

    #[test]
    fn unknown_enum_value_defaults_to_first_or_null() {
        let unknown = RowValues::Text("Archived".into());
        assert_eq!(
            convert(&unknown, &TargetType::new(TargetKind::Enum(STATUS)), &opts()),
            RowValues::Text("Active".into())
        );
        assert_eq!(
            convert(&unknown, &TargetType::nullable(TargetKind::Enum(STATUS)), &opts()),
            RowValues::Null
        );
    }

    #[test]
    fn date_target_truncates_time() {
        let value = RowValues::Text("2024-03-05 17:30:00".into());
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            convert(&value, &TargetType::new(TargetKind::Date), &opts()),
            RowValues::Timestamp(expected)
        );
    }

    #[test]
    fn excel_serial_converts_when_enabled() {
        let target = TargetType::new(TargetKind::DateTime);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            convert(&RowValues::Int(45292), &target, &opts().with_excel_date(true)),
            RowValues::Timestamp(expected)
        );
        assert_eq!(
            convert_reported(&RowValues::Int(45292), &target, &opts()).outcome,
            CoercionOutcome::Defaulted
        );
    }

    #[test]
    fn text_target_renders_blob_as_hex_and_float_by_locale() {
        let target = TargetType::new(TargetKind::Text);
        assert_eq!(
            convert(&RowValues::Blob(vec![0xde, 0xad, 0x01]), &target, &opts()),
            RowValues::Text("dead01".into())
        );
        assert_eq!(
            convert(&RowValues::Float(1.5), &target, &opts().with_locale(Locale::DE_DE)),
            RowValues::Text("1,5".into())
        );
    }

    #[test]
    fn text_target_uses_explicit_date_format() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(
            convert(
                &RowValues::Timestamp(ts),
                &TargetType::new(TargetKind::Text),
                &opts().with_date_format("%Y%m%d")
            ),
            RowValues::Text("20240305".into())
        );
    }

    #[test]
    fn invalid_date_format_falls_back_to_locale_pattern() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let target = TargetType::new(TargetKind::Text);
        assert_eq!(
            convert(&RowValues::Timestamp(ts), &target, &opts().with_date_format("%Y-%Q")),
            RowValues::Text("03/05/2024 08:00:00".into())
        );
        // valid specifier, but a naive timestamp has no zone to print
        assert_eq!(
            convert(
                &RowValues::Timestamp(ts),
                &target,
                &opts().with_locale(Locale::DE_DE).with_date_format("%Y %z")
            ),
            RowValues::Text("05.03.2024 08:00:00".into())
        );
    }

    const EMPTY_ENUM: &[(&str, i64)] = &[];

    fn every_kind() -> Vec<TargetKind> {
        let mut kinds: Vec<TargetKind> = [
            IntWidth::I8,
            IntWidth::I16,
            IntWidth::I32,
            IntWidth::I64,
            IntWidth::U8,
            IntWidth::U16,
            IntWidth::U32,
            IntWidth::U64,
        ]
        .into_iter()
        .map(TargetKind::Integer)
        .collect();
        kinds.extend([
            TargetKind::Float(FloatWidth::F32),
            TargetKind::Float(FloatWidth::F64),
            TargetKind::Bool,
            TargetKind::DateTime,
            TargetKind::Date,
            TargetKind::Text,
            TargetKind::Enum(STATUS),
            TargetKind::Enum(EMPTY_ENUM),
            TargetKind::Bytes,
            TargetKind::Json,
        ]);
        kinds
    }

    fn awkward_inputs() -> Vec<RowValues> {
        vec![
            RowValues::Null,
            RowValues::Text(String::new()),
            RowValues::Text("   ".into()),
            RowValues::Text("null".into()),
            RowValues::Text("1.2.3".into()),
            RowValues::Text("--7".into()),
            RowValues::Text("-".into()),
            RowValues::Text("99999999999999999999999999".into()),
            RowValues::Text("2024-13-45".into()),
            RowValues::Text("31/02/2024 25:61".into()),
            RowValues::Text("1e400".into()),
            RowValues::Text("ünïcødé ✓".into()),
            RowValues::Int(i64::MAX),
            RowValues::Int(i64::MIN),
            RowValues::Int(-1),
            RowValues::Float(f64::NAN),
            RowValues::Float(f64::INFINITY),
            RowValues::Float(f64::NEG_INFINITY),
            RowValues::Float(f64::MAX),
            RowValues::Float(-0.0),
            RowValues::Bool(true),
            RowValues::Timestamp(NaiveDateTime::MIN),
            RowValues::Timestamp(NaiveDateTime::MAX),
            RowValues::Blob(Vec::new()),
            RowValues::Blob(vec![0xff; 4096]),
            RowValues::JSON(serde_json::json!({"nested": [1, 2, {"deep": null}]})),
            RowValues::JSON(serde_json::json!("2024-03-05")),
            RowValues::JSON(serde_json::json!(1.0e300)),
            RowValues::JSON(serde_json::Value::Null),
        ]
    }

    fn awkward_options() -> Vec<CoerceOptions> {
        const SAME_SEPARATORS: Locale =
            Locale::custom("xx-SAME", ',', ',', &["%Q %Q"], &["%"], "%Q");
        vec![
            CoerceOptions::default(),
            opts().with_date_format("%Y-%Q"),
            opts().with_date_format("%"),
            opts().with_date_format("%z %Z"),
            opts().with_excel_date(true),
            opts()
                .with_excel_date(true)
                .with_date_format("")
                .with_locale(Locale::ID_ID),
            opts().with_locale(SAME_SEPARATORS),
            opts()
                .with_locale(SAME_SEPARATORS)
                .with_excel_date(true)
                .with_date_format("%Q"),
        ]
    }

    fn has_storage_shape(kind: TargetKind, value: &RowValues) -> bool {
        match kind {
            TargetKind::Integer(width) => {
                matches!(value, RowValues::Int(i) if width.contains(*i))
            }
            TargetKind::Float(_) => matches!(value, RowValues::Float(_)),
            TargetKind::Bool => matches!(value, RowValues::Bool(_)),
            TargetKind::DateTime | TargetKind::Date => matches!(value, RowValues::Timestamp(_)),
            TargetKind::Text => matches!(value, RowValues::Text(_)),
            TargetKind::Enum(members) => match value {
                RowValues::Text(name) => members.iter().any(|(n, _)| n == name),
                RowValues::Null => members.is_empty(),
                _ => false,
            },
            TargetKind::Bytes => matches!(value, RowValues::Blob(_)),
            TargetKind::Json => matches!(value, RowValues::JSON(_)),
        }
    }

    #[test]
    fn conversion_is_total_over_awkward_inputs_and_options() {
        for kind in every_kind() {
            for target in [TargetType::new(kind), TargetType::nullable(kind)] {
                for options in awkward_options() {
                    for input in awkward_inputs() {
                        let report = convert_reported(&input, &target, &options);
                        let context = format!("{input:?} -> {target:?} with {options:?}");
                        if report.outcome == CoercionOutcome::Defaulted {
                            assert_eq!(report.value, target.default_value(), "{context}");
                        }
                        if input.is_null_like() {
                            assert_eq!(report.value, target.default_value(), "{context}");
                        }
                        if !(target.nullable && report.value.is_null()) {
                            assert!(has_storage_shape(kind, &report.value), "{context}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn json_target_parses_text_or_wraps_it() {
        let target = TargetType::new(TargetKind::Json);
        assert_eq!(
            convert(&RowValues::Text(r#"{"a":1}"#.into()), &target, &opts()),
            RowValues::JSON(serde_json::json!({"a": 1}))
        );
        assert_eq!(
            convert(&RowValues::Text("plain".into()), &target, &opts()),
            RowValues::JSON(serde_json::json!("plain"))
        );
    }
}

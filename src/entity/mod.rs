//! Entity metadata: table and column names, keys, generated values and
//! import/export mapping, built once per type.

mod descriptor;
mod mapping;

pub use descriptor::{
    EntityDescriptor, EntityDescriptorBuilder, GeneratedValue, MappingMeta, Marker,
    PropertyDescriptor,
};
pub use mapping::{
    AUDIT_PROPERTIES, ColumnMapping, MappingOption, extract_column_mapping,
    extract_columns_with_markers, extract_mapping,
};

use crate::coerce::CoerceOptions;
use crate::types::RowValues;

/// A record type the data layer can persist and materialize.
///
/// Usually implemented with [`impl_entity!`](crate::impl_entity); a manual
/// implementation must return the same descriptor on every call.
pub trait Entity: Default + Send + 'static {
    fn descriptor() -> &'static EntityDescriptor;

    /// Current value of `property`, or `None` when the type has no such
    /// readable property.
    fn get_value(&self, property: &str) -> Option<RowValues>;

    /// Coerce `value` into `property`. Returns `false` when the type has no
    /// such writable property.
    fn set_value(&mut self, property: &str, value: &RowValues, options: &CoerceOptions) -> bool;
}

/// Implement [`Entity`] for a struct whose fields are all
/// [`Coercible`](crate::coerce::Coercible).
///
/// ```rust
/// use sql_entity::impl_entity;
/// use sql_entity::entity::{Entity, Marker, extract_column_mapping};
///
/// #[derive(Debug, Default)]
/// struct Employee {
///     id: i64,
///     name: String,
///     age: Option<i32>,
/// }
///
/// impl_entity!(Employee in "Mst_Employee" {
///     id: i64 => [key, identity],
///     name: String => [max_length = 100],
///     age: Option<i32> => [column = "Age"],
/// });
///
/// assert_eq!(Employee::descriptor().table_name(), "Mst_Employee");
/// let insertable = extract_column_mapping::<Employee>(&[Marker::Generated]);
/// assert_eq!(insertable.len(), 2);
/// ```
///
/// Table forms: `Type { .. }` (table named after the type),
/// `Type in "table" { .. }` and `Type in "schema"."table" { .. }`.
///
/// Property markers: `key`, `identity`, `computed`, `read_only`,
/// `not_mapped`, `column = ..`, `max_length = ..`, `display = ..`,
/// `caption = ..`, `field = ..`, `width = ..`, `sequence = ..`,
/// `data_type = ..`.
#[macro_export]
macro_rules! impl_entity {
    (@apply $p:expr;) => { $p };
    (@apply $p:expr; key $(, $($rest:tt)*)?) => {
        $crate::impl_entity!(@apply $p.key(); $($($rest)*)?)
    };
    (@apply $p:expr; identity $(, $($rest:tt)*)?) => {
        $crate::impl_entity!(@apply $p.identity(); $($($rest)*)?)
    };
    (@apply $p:expr; computed $(, $($rest:tt)*)?) => {
        $crate::impl_entity!(@apply $p.computed(); $($($rest)*)?)
    };
    (@apply $p:expr; read_only $(, $($rest:tt)*)?) => {
        $crate::impl_entity!(@apply $p.read_only(); $($($rest)*)?)
    };
    (@apply $p:expr; not_mapped $(, $($rest:tt)*)?) => {
        $crate::impl_entity!(@apply $p.not_mapped(); $($($rest)*)?)
    };
    (@apply $p:expr; $setter:ident = $value:expr $(, $($rest:tt)*)?) => {
        $crate::impl_entity!(@apply $p.$setter($value); $($($rest)*)?)
    };

    (@impl $ty:ident, [$($locate:tt)*], {
        $($field:ident : $fty:ty $(=> [$($marker:tt)*])?),* $(,)?
    }) => {
        impl $crate::entity::Entity for $ty {
            fn descriptor() -> &'static $crate::entity::EntityDescriptor {
                static DESCRIPTOR: ::std::sync::LazyLock<$crate::entity::EntityDescriptor> =
                    ::std::sync::LazyLock::new(|| {
                        $crate::entity::EntityDescriptor::builder(stringify!($ty))
                            $($locate)*
                            $(.property($crate::impl_entity!(
                                @apply $crate::entity::PropertyDescriptor::of::<$fty>(stringify!($field));
                                $($($marker)*)?
                            )))*
                            .build()
                    });
                &DESCRIPTOR
            }

            fn get_value(&self, property: &str) -> Option<$crate::RowValues> {
                match property {
                    $(stringify!($field) => {
                        Some($crate::coerce::Coercible::to_value(&self.$field))
                    })*
                    _ => None,
                }
            }

            fn set_value(
                &mut self,
                property: &str,
                value: &$crate::RowValues,
                options: &$crate::coerce::CoerceOptions,
            ) -> bool {
                match property {
                    $(stringify!($field) => {
                        self.$field = $crate::coerce::coerce::<$fty>(value, options);
                        true
                    })*
                    _ => false,
                }
            }
        }
    };

    ($ty:ident in $schema:literal . $table:literal { $($body:tt)* }) => {
        $crate::impl_entity!(@impl $ty, [.schema($schema).table($table)], { $($body)* });
    };
    ($ty:ident in $table:literal { $($body:tt)* }) => {
        $crate::impl_entity!(@impl $ty, [.table($table)], { $($body)* });
    };
    ($ty:ident { $($body:tt)* }) => {
        $crate::impl_entity!(@impl $ty, [], { $($body)* });
    };
}

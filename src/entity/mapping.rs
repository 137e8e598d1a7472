use super::{Entity, Marker, PropertyDescriptor};
use crate::coerce::TargetType;

/// Properties left out of [`extract_mapping`] unless the caller passes its
/// own exclusion list.
pub const AUDIT_PROPERTIES: &[&str] = &["CreatedTime", "CreatedBy", "ModifiedTime", "ModifiedBy"];

const DEFAULT_WIDTH: u32 = 50;

/// Presentation mapping of one property, as used by import/export tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingOption {
    pub property: &'static str,
    pub field: &'static str,
    pub caption: &'static str,
    pub width: u32,
    pub sequence: u32,
    pub data_type: TargetType,
}

/// Property to column correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub property: &'static str,
    pub column: &'static str,
    pub target: TargetType,
}

impl From<&PropertyDescriptor> for ColumnMapping {
    fn from(property: &PropertyDescriptor) -> Self {
        ColumnMapping {
            property: property.name,
            column: property.column_name(),
            target: property.target,
        }
    }
}

/// Compare property names ignoring case and underscores, so `created_by`
/// matches `CreatedBy`.
fn same_property(a: &str, b: &str) -> bool {
    let fold = |s: &str| -> String {
        s.chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect()
    };
    fold(a) == fold(b)
}

/// Build the import/export mapping for `T`.
///
/// `excluded` defaults to [`AUDIT_PROPERTIES`]. Unmapped and non-scalar
/// properties are skipped. Sequences not given explicitly continue from the
/// highest sequence assigned so far.
#[must_use]
pub fn extract_mapping<T: Entity>(excluded: Option<&[&str]>) -> Vec<MappingOption> {
    let excluded = excluded.unwrap_or(AUDIT_PROPERTIES);
    let mut output: Vec<MappingOption> = Vec::new();

    for property in T::descriptor().properties() {
        if excluded.iter().any(|name| same_property(name, property.name)) {
            continue;
        }
        if property.not_mapped || !property.target.kind.is_scalar() {
            continue;
        }
        let meta = property.mapping.unwrap_or_default();
        let caption = meta
            .caption
            .or(property.column)
            .or(property.display)
            .unwrap_or(property.name);
        let field = meta.field.or(property.column).unwrap_or(property.name);
        let width = if meta.width == 0 {
            DEFAULT_WIDTH
        } else {
            meta.width
        };
        let sequence = meta.sequence.unwrap_or_else(|| {
            output
                .iter()
                .map(|m| m.sequence)
                .max()
                .unwrap_or(0)
                .saturating_add(1)
        });
        output.push(MappingOption {
            property: property.name,
            field,
            caption,
            width,
            sequence,
            data_type: meta.data_type.unwrap_or(property.target),
        });
    }
    output
}

/// Mapped columns of `T` that carry none of `excluded_markers`.
#[must_use]
pub fn extract_column_mapping<T: Entity>(excluded_markers: &[Marker]) -> Vec<ColumnMapping> {
    T::descriptor()
        .properties()
        .iter()
        .filter(|p| !p.not_mapped && !p.has_any_marker(excluded_markers))
        .map(ColumnMapping::from)
        .collect()
}

/// Mapped columns of `T` that carry at least one of `markers`.
#[must_use]
pub fn extract_columns_with_markers<T: Entity>(markers: &[Marker]) -> Vec<ColumnMapping> {
    T::descriptor()
        .properties()
        .iter()
        .filter(|p| !p.not_mapped && p.has_any_marker(markers))
        .map(ColumnMapping::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::coerce::{FloatWidth, TargetKind};
    use crate::impl_entity;

    #[derive(Debug, Default)]
    struct Product {
        id: i64,
        sku: String,
        price: f64,
        stock: i32,
        photo: Vec<u8>,
        note: String,
        created_time: NaiveDateTime,
        created_by: String,
        row_version: i64,
    }

    impl_entity!(Product in "Mst_Product" {
        id: i64 => [key, identity, caption = "No."],
        sku: String => [column = "SKU", display = "Stock keeping unit"],
        price: f64 => [display = "Unit price", width = 12, data_type = crate::coerce::TargetType::new(TargetKind::Float(FloatWidth::F32))],
        stock: i32 => [sequence = 10],
        photo: Vec<u8>,
        note: String => [not_mapped],
        created_time: NaiveDateTime,
        created_by: String,
        row_version: i64 => [computed, read_only],
    });

    #[test]
    fn mapping_skips_audit_unmapped_and_binary_properties() {
        let mapping = extract_mapping::<Product>(None);
        let names: Vec<_> = mapping.iter().map(|m| m.property).collect();
        assert_eq!(names, ["id", "sku", "price", "stock", "row_version"]);
    }

    #[test]
    fn caption_and_field_resolution_order() {
        let mapping = extract_mapping::<Product>(None);
        assert_eq!(mapping[0].caption, "No.");
        assert_eq!(mapping[0].field, "id");
        assert_eq!(mapping[1].caption, "SKU");
        assert_eq!(mapping[1].field, "SKU");
        assert_eq!(mapping[2].caption, "Unit price");
        assert_eq!(mapping[2].width, 12);
        assert_eq!(
            mapping[2].data_type.kind,
            TargetKind::Float(FloatWidth::F32)
        );
        assert_eq!(mapping[4].caption, "row_version");
        assert_eq!(mapping[4].width, 50);
    }

    #[test]
    fn sequences_continue_after_explicit_ones() {
        let sequences: Vec<_> = extract_mapping::<Product>(None)
            .iter()
            .map(|m| m.sequence)
            .collect();
        assert_eq!(sequences, [1, 2, 3, 10, 11]);
    }

    #[derive(Debug, Default)]
    struct Tail {
        first: i32,
        second: i32,
        third: i32,
    }

    impl_entity!(Tail {
        first: i32 => [sequence = u32::MAX],
        second: i32,
        third: i32,
    });

    #[test]
    fn sequence_after_the_largest_explicit_one_saturates() {
        let sequences: Vec<_> = extract_mapping::<Tail>(None)
            .iter()
            .map(|m| m.sequence)
            .collect();
        assert_eq!(sequences, [u32::MAX, u32::MAX, u32::MAX]);
    }

    #[test]
    fn explicit_exclusions_replace_the_defaults() {
        let mapping = extract_mapping::<Product>(Some(&["SKU", "price"]));
        let names: Vec<_> = mapping.iter().map(|m| m.property).collect();
        assert_eq!(
            names,
            ["id", "stock", "created_time", "created_by", "row_version"]
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        assert_eq!(extract_mapping::<Product>(None), extract_mapping::<Product>(None));
        assert_eq!(
            extract_column_mapping::<Product>(&[]),
            extract_column_mapping::<Product>(&[])
        );
    }

    #[test]
    fn column_mapping_filters_by_marker() {
        let insertable: Vec<_> =
            extract_column_mapping::<Product>(&[Marker::ReadOnly, Marker::Generated])
                .into_iter()
                .map(|c| c.column)
                .collect();
        assert_eq!(
            insertable,
            ["SKU", "price", "stock", "photo", "created_time", "created_by"]
        );
        let keys: Vec<_> = extract_columns_with_markers::<Product>(&[Marker::Key])
            .into_iter()
            .map(|c| c.column)
            .collect();
        assert_eq!(keys, ["id"]);
    }
}

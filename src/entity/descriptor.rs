use crate::coerce::{Coercible, TargetType};

/// How the database fills a column without the caller's help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeneratedValue {
    #[default]
    None,
    /// Auto-increment key; returned after INSERT and written back.
    Identity,
    /// Derived by the database on every write.
    Computed,
}

/// Markers used to filter properties out of (or into) a column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Key,
    /// Any generated value, identity or computed.
    Generated,
    ReadOnly,
}

/// Import/export presentation overrides for one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MappingMeta {
    pub caption: Option<&'static str>,
    pub field: Option<&'static str>,
    /// `0` counts as unset.
    pub width: u32,
    pub sequence: Option<u32>,
    pub data_type: Option<TargetType>,
}

/// Metadata for one property of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub target: TargetType,
    pub key: bool,
    pub generated: GeneratedValue,
    pub read_only: bool,
    pub not_mapped: bool,
    /// Informational; never enforced.
    pub max_length: Option<u32>,
    pub display: Option<&'static str>,
    pub mapping: Option<MappingMeta>,
}

impl PropertyDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, target: TargetType) -> Self {
        PropertyDescriptor {
            name,
            column: None,
            target,
            key: false,
            generated: GeneratedValue::None,
            read_only: false,
            not_mapped: false,
            max_length: None,
            display: None,
            mapping: None,
        }
    }

    /// Property whose target comes from a Rust field type.
    #[must_use]
    pub fn of<T: Coercible>(name: &'static str) -> Self {
        Self::new(name, T::target_type())
    }

    /// Database column; the property name unless overridden.
    #[must_use]
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }

    #[must_use]
    pub fn has_marker(&self, marker: Marker) -> bool {
        match marker {
            Marker::Key => self.key,
            Marker::Generated => self.generated != GeneratedValue::None,
            Marker::ReadOnly => self.read_only,
        }
    }

    #[must_use]
    pub fn has_any_marker(&self, markers: &[Marker]) -> bool {
        markers.iter().any(|m| self.has_marker(*m))
    }

    #[must_use]
    pub fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    #[must_use]
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    #[must_use]
    pub fn generated(mut self, generated: GeneratedValue) -> Self {
        self.generated = generated;
        self
    }

    #[must_use]
    pub fn identity(self) -> Self {
        self.generated(GeneratedValue::Identity)
    }

    #[must_use]
    pub fn computed(self) -> Self {
        self.generated(GeneratedValue::Computed)
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn not_mapped(mut self) -> Self {
        self.not_mapped = true;
        self
    }

    #[must_use]
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn display(mut self, display: &'static str) -> Self {
        self.display = Some(display);
        self
    }

    #[must_use]
    pub fn caption(mut self, caption: &'static str) -> Self {
        self.mapping_mut().caption = Some(caption);
        self
    }

    #[must_use]
    pub fn field(mut self, field: &'static str) -> Self {
        self.mapping_mut().field = Some(field);
        self
    }

    #[must_use]
    pub fn width(mut self, width: u32) -> Self {
        self.mapping_mut().width = width;
        self
    }

    #[must_use]
    pub fn sequence(mut self, sequence: u32) -> Self {
        self.mapping_mut().sequence = Some(sequence);
        self
    }

    #[must_use]
    pub fn data_type(mut self, data_type: TargetType) -> Self {
        self.mapping_mut().data_type = Some(data_type);
        self
    }

    fn mapping_mut(&mut self) -> &mut MappingMeta {
        self.mapping.get_or_insert_with(MappingMeta::default)
    }
}

/// Everything the data layer knows about an entity type: where it lives
/// and how each property maps to a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    type_name: &'static str,
    table: Option<&'static str>,
    schema: Option<&'static str>,
    properties: Vec<PropertyDescriptor>,
}

impl EntityDescriptor {
    #[must_use]
    pub fn builder(type_name: &'static str) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            descriptor: EntityDescriptor {
                type_name,
                table: None,
                schema: None,
                properties: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Table reference used in generated SQL: `schema.table` when a schema
    /// is set; the type name when no table is declared.
    #[must_use]
    pub fn table_name(&self) -> String {
        let table = self.table.unwrap_or(self.type_name);
        match self.schema {
            Some(schema) => format!("{schema}.{table}"),
            None => table.to_owned(),
        }
    }

    /// Properties in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Whether the type has any properties at all.
    #[must_use]
    pub fn is_record(&self) -> bool {
        !self.properties.is_empty()
    }

    /// Mapped key properties in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.key && !p.not_mapped)
    }

    /// The identity property, if one is declared.
    #[must_use]
    pub fn identity(&self) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.generated == GeneratedValue::Identity && !p.not_mapped)
    }
}

/// Fluent builder for [`EntityDescriptor`].
#[derive(Debug, Clone)]
pub struct EntityDescriptorBuilder {
    descriptor: EntityDescriptor,
}

impl EntityDescriptorBuilder {
    #[must_use]
    pub fn table(mut self, table: &'static str) -> Self {
        self.descriptor.table = Some(table);
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: &'static str) -> Self {
        self.descriptor.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.descriptor.properties.push(property);
        self
    }

    #[must_use]
    pub fn build(self) -> EntityDescriptor {
        self.descriptor
    }
}

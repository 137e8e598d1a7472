//! Turn entities and ad-hoc parameter sources into named [`Param`] lists.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::entity::{Entity, Marker};
use crate::error::SqlEntityError;
use crate::query::Param;
use crate::types::{QueryIntent, RowValues};

/// Markers that keep a property out of the parameter list for `intent`.
#[must_use]
pub fn excluded_markers(intent: QueryIntent) -> &'static [Marker] {
    match intent {
        QueryIntent::Insert => &[Marker::ReadOnly, Marker::Generated],
        QueryIntent::Update | QueryIntent::Delete => &[Marker::ReadOnly],
        QueryIntent::Select | QueryIntent::Any => &[],
    }
}

/// One entry of a [`ParamBag`].
#[derive(Debug, Clone, PartialEq)]
pub struct BagEntry {
    pub name: String,
    pub value: RowValues,
    pub markers: Vec<Marker>,
}

/// An unstructured parameter source: names and values, optionally tagged
/// with the same markers entity properties carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag {
    entries: Vec<BagEntry>,
}

impl ParamBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.insert(name, value, &[]);
        self
    }

    #[must_use]
    pub fn with_markers(
        mut self,
        name: impl Into<String>,
        value: impl Into<RowValues>,
        markers: &[Marker],
    ) -> Self {
        self.insert(name, value, markers);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RowValues>, markers: &[Marker]) {
        self.entries.push(BagEntry {
            name: name.into(),
            value: value.into(),
            markers: markers.to_vec(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BagEntry> {
        self.entries.iter()
    }
}

/// Bind every mapped property of `entity` not excluded for `intent`.
/// Parameters are named `@column`; unreadable properties bind as `Null`.
#[must_use]
pub fn bind_parameters<T: Entity>(entity: &T, intent: QueryIntent) -> Vec<Param> {
    let excluded = excluded_markers(intent);
    T::descriptor()
        .properties()
        .iter()
        .filter(|p| !p.not_mapped && !p.has_any_marker(excluded))
        .map(|p| Param {
            name: format!("@{}", p.column_name()),
            value: entity.get_value(p.name).unwrap_or(RowValues::Null),
        })
        .collect()
}

/// Bind the entries of `bag` not excluded for `intent`.
#[must_use]
pub fn bind_bag(bag: &ParamBag, intent: QueryIntent) -> Vec<Param> {
    let excluded = excluded_markers(intent);
    bag.iter()
        .filter(|entry| !entry.markers.iter().any(|m| excluded.contains(m)))
        .map(|entry| Param::new(entry.name.clone(), entry.value.clone()))
        .collect()
}

/// Bind the fields of a JSON object. Anonymous objects carry no markers, so
/// every field is bound whatever the intent.
///
/// # Errors
///
/// `SqlEntityError::ArgumentNull` for JSON `null`;
/// `SqlEntityError::ArgumentNotValid` for primitives and arrays.
pub fn bind_json(value: &JsonValue, intent: QueryIntent) -> Result<Vec<Param>, SqlEntityError> {
    match value {
        JsonValue::Null => Err(SqlEntityError::ArgumentNull(
            "parameter source is null".into(),
        )),
        JsonValue::Object(fields) => {
            let mut bag = ParamBag::new();
            for (name, field) in fields {
                bag.insert(name.clone(), json_to_value(field), &[]);
            }
            Ok(bind_bag(&bag, intent))
        }
        other => Err(SqlEntityError::ArgumentNotValid(format!(
            "parameter source must be an object, got {}",
            json_type_name(other)
        ))),
    }
}

/// Bind any serializable record, such as an anonymous-struct-like value.
///
/// # Errors
///
/// Same as [`bind_json`], plus `SqlEntityError::ArgumentNotValid` when
/// serialization fails.
pub fn bind_serialize<S: Serialize + ?Sized>(
    value: &S,
    intent: QueryIntent,
) -> Result<Vec<Param>, SqlEntityError> {
    let json = serde_json::to_value(value)
        .map_err(|e| SqlEntityError::ArgumentNotValid(format!("cannot serialize parameters: {e}")))?;
    bind_json(&json, intent)
}

/// Map a JSON scalar to its natural [`RowValues`] variant; containers stay JSON.
#[must_use]
pub fn json_to_value(value: &JsonValue) -> RowValues {
    match value {
        JsonValue::Null => RowValues::Null,
        JsonValue::Bool(b) => RowValues::Bool(*b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(RowValues::Int)
            .or_else(|| n.as_f64().map(RowValues::Float))
            .unwrap_or_else(|| RowValues::Text(n.to_string())),
        JsonValue::String(s) => RowValues::Text(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => RowValues::JSON(value.clone()),
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

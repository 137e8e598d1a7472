//! CRUD statement synthesis from entity metadata.
//!
//! Columns are emitted in declaration order and every value is referenced
//! as `@column`, matching the names produced by [`crate::binder`].

use crate::entity::{ColumnMapping, Entity, Marker, extract_column_mapping, extract_columns_with_markers};
use crate::error::SqlEntityError;
use crate::types::{Dialect, QueryIntent};

fn placeholder(column: &str) -> String {
    format!("@{column}")
}

fn assignments(columns: &[ColumnMapping], separator: &str) -> String {
    columns
        .iter()
        .map(|c| format!("{} = {}", c.column, placeholder(c.column)))
        .collect::<Vec<_>>()
        .join(separator)
}

fn key_columns<T: Entity>(intent: QueryIntent) -> Result<Vec<ColumnMapping>, SqlEntityError> {
    let keys = extract_columns_with_markers::<T>(&[Marker::Key]);
    if keys.is_empty() {
        return Err(SqlEntityError::ConfigError(format!(
            "{intent:?} requires a key property on {}",
            T::descriptor().type_name()
        )));
    }
    Ok(keys)
}

/// Render the INSERT, UPDATE or DELETE statement for `T`, followed by the
/// dialect's identity or row-count query.
///
/// ```rust
/// use sql_entity::impl_entity;
/// use sql_entity::prelude::*;
///
/// #[derive(Debug, Default)]
/// struct Employee { id: i64, name: String, age: i32 }
///
/// impl_entity!(Employee in "Mst_Employee" {
///     id: i64 => [key, identity, column = "Id"],
///     name: String => [column = "Name"],
///     age: i32 => [column = "Age"],
/// });
///
/// let sql = build_statement::<Employee>(QueryIntent::Insert, Dialect::Sqlite)?;
/// assert_eq!(
///     sql,
///     "INSERT INTO Mst_Employee(Name, Age) VALUES(@Name, @Age); SELECT last_insert_rowid();"
/// );
/// # Ok::<(), SqlEntityError>(())
/// ```
///
/// # Errors
///
/// Returns `SqlEntityError::ConfigError` when an UPDATE or DELETE is asked
/// of a type without key properties, or an UPDATE of a type with nothing
/// left to set. Returns `SqlEntityError::ArgumentNotValid` for `Select` and
/// `Any`, which have no generic form.
pub fn build_statement<T: Entity>(
    intent: QueryIntent,
    dialect: Dialect,
) -> Result<String, SqlEntityError> {
    let table = T::descriptor().table_name();
    match intent {
        QueryIntent::Insert => {
            let columns = extract_column_mapping::<T>(&[Marker::ReadOnly, Marker::Generated]);
            let insert = if columns.is_empty() {
                format!("INSERT INTO {table} DEFAULT VALUES;")
            } else {
                let names: Vec<_> = columns.iter().map(|c| c.column).collect();
                let values: Vec<_> = columns.iter().map(|c| placeholder(c.column)).collect();
                format!(
                    "INSERT INTO {table}({}) VALUES({});",
                    names.join(", "),
                    values.join(", ")
                )
            };
            Ok(format!("{insert} {}", dialect.identity_clause()))
        }
        QueryIntent::Update => {
            let keys = key_columns::<T>(intent)?;
            let columns =
                extract_column_mapping::<T>(&[Marker::ReadOnly, Marker::Generated, Marker::Key]);
            if columns.is_empty() {
                return Err(SqlEntityError::ConfigError(format!(
                    "Update has no updatable columns on {}",
                    T::descriptor().type_name()
                )));
            }
            Ok(format!(
                "UPDATE {table} SET {} WHERE {}; {}",
                assignments(&columns, ", "),
                assignments(&keys, " AND "),
                dialect.row_count_clause()
            ))
        }
        QueryIntent::Delete => {
            let keys = key_columns::<T>(intent)?;
            Ok(format!(
                "DELETE FROM {table} WHERE {}; {}",
                assignments(&keys, " AND "),
                dialect.row_count_clause()
            ))
        }
        QueryIntent::Select | QueryIntent::Any => Err(SqlEntityError::ArgumentNotValid(format!(
            "no generic {intent:?} statement for {}",
            T::descriptor().type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::impl_entity;

    #[derive(Debug, Default)]
    struct Employee {
        id: i64,
        name: String,
        age: i32,
    }

    impl_entity!(Employee in "Mst_Employee" {
        id: i64 => [key, identity, column = "Id"],
        name: String => [column = "Name"],
        age: i32 => [column = "Age"],
    });

    #[derive(Debug, Default)]
    struct OrderLine {
        order_id: i64,
        line_no: i32,
        qty: f64,
        total: f64,
        stamp: i64,
    }

    impl_entity!(OrderLine in "sales"."OrderLine" {
        order_id: i64 => [key],
        line_no: i32 => [key],
        qty: f64,
        total: f64 => [computed],
        stamp: i64 => [read_only],
    });

    #[derive(Debug, Default)]
    struct AuditEntry {
        message: String,
    }

    impl_entity!(AuditEntry { message: String });

    #[derive(Debug, Default)]
    struct Counter {
        id: i64,
    }

    impl_entity!(Counter { id: i64 => [key, identity] });

    #[test]
    fn insert_skips_generated_key() {
        let sql = build_statement::<Employee>(QueryIntent::Insert, Dialect::Sqlite).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO Mst_Employee(Name, Age) VALUES(@Name, @Age); SELECT last_insert_rowid();"
        );
    }

    #[test]
    fn insert_with_no_columns_uses_default_values() {
        let sql = build_statement::<Counter>(QueryIntent::Insert, Dialect::Mssql).unwrap();
        assert_eq!(sql, "INSERT INTO Counter DEFAULT VALUES; SELECT SCOPE_IDENTITY();");
    }

    #[test]
    fn update_sets_non_key_columns_and_matches_all_keys() {
        let sql = build_statement::<OrderLine>(QueryIntent::Update, Dialect::Sqlite).unwrap();
        assert_eq!(
            sql,
            "UPDATE sales.OrderLine SET qty = @qty WHERE order_id = @order_id AND line_no = @line_no; SELECT changes();"
        );
    }

    #[test]
    fn delete_matches_keys() {
        let sql = build_statement::<Employee>(QueryIntent::Delete, Dialect::Mssql).unwrap();
        assert_eq!(sql, "DELETE FROM Mst_Employee WHERE Id = @Id; SELECT @@ROWCOUNT;");
    }

    #[test]
    fn update_and_delete_without_key_fail_fast() {
        for intent in [QueryIntent::Update, QueryIntent::Delete] {
            let err = build_statement::<AuditEntry>(intent, Dialect::Sqlite).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }

    #[test]
    fn update_with_only_keys_is_a_configuration_error() {
        let err = build_statement::<Counter>(QueryIntent::Update, Dialect::Sqlite).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn select_has_no_generic_form() {
        let err = build_statement::<Employee>(QueryIntent::Select, Dialect::Sqlite).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentNotValid);
    }
}

use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Connection, Statement};

use super::params::bind_statement;
use crate::error::SqlEntityError;
use crate::query::Param;
use crate::results::ResultSet;
use crate::split::split_statements;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlEntityError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlEntityError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Drain an already-bound statement into a result set.
fn build_result_set(stmt: &mut Statement<'_>) -> Result<ResultSet, SqlEntityError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(values);
    }
    Ok(result_set)
}

/// What running a script produced.
#[derive(Debug, Default)]
pub(crate) struct ScriptOutcome {
    /// Rows of the first statement that returned columns.
    pub first_result: Option<ResultSet>,
    /// Rows changed by statements that returned no columns.
    pub rows_changed: usize,
}

impl ScriptOutcome {
    /// First column of the first row of the first result, else the change count.
    pub fn scalar(self) -> RowValues {
        let first = self
            .first_result
            .and_then(|rs| rs.results.into_iter().next())
            .and_then(|row| row.values.into_iter().next());
        first.unwrap_or_else(|| {
            RowValues::Int(i64::try_from(self.rows_changed).unwrap_or(i64::MAX))
        })
    }
}

/// Run every statement of `sql` in order on `conn`, each bound to the
/// parameters it references.
///
/// # Errors
///
/// Returns the first preparation, binding or execution failure; later
/// statements do not run.
pub(crate) fn run_script(
    conn: &Connection,
    sql: &str,
    params: &[Param],
) -> Result<ScriptOutcome, SqlEntityError> {
    let mut outcome = ScriptOutcome::default();
    let mut positional = 0;
    for statement in split_statements(sql) {
        tracing::debug!(sql = statement, params = params.len(), "sqlite statement");
        let mut stmt = conn.prepare(statement)?;
        bind_statement(&mut stmt, params, &mut positional)?;
        if stmt.column_count() > 0 {
            let result_set = build_result_set(&mut stmt)?;
            if outcome.first_result.is_none() {
                outcome.first_result = Some(result_set);
            }
        } else {
            outcome.rows_changed += stmt.raw_execute()?;
        }
    }
    Ok(outcome)
}

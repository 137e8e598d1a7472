use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::SqlEntityError;
use crate::query::Param;
use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
///
/// Booleans become `0`/`1`, timestamps ISO-like text, JSON its serialized text.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(json) => Value::Text(json.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

fn find_named<'p>(params: &'p [Param], name: &str) -> Option<&'p Param> {
    let bare = name.trim_start_matches(['@', ':', '$']);
    params
        .iter()
        .find(|p| p.bare_name() == bare)
        .or_else(|| params.iter().find(|p| p.bare_name().eq_ignore_ascii_case(bare)))
}

/// Bind the parameters `stmt` references.
///
/// Named placeholders (`@x`, `:x`, `$x`) are matched by name, with or
/// without sigil and then ignoring case. Anonymous `?` and numbered `?N`
/// placeholders take `params` in order, continuing from `positional` so a
/// multi-statement script consumes them left to right.
///
/// # Errors
///
/// Returns `SqlEntityError::ParameterError` when a placeholder has no value.
pub(crate) fn bind_statement(
    stmt: &mut Statement<'_>,
    params: &[Param],
    positional: &mut usize,
) -> Result<(), SqlEntityError> {
    for idx in 1..=stmt.parameter_count() {
        let named = stmt
            .parameter_name(idx)
            .filter(|name| !name.starts_with('?'))
            .map(str::to_owned);
        let param = match named {
            Some(name) => find_named(params, &name).ok_or_else(|| {
                SqlEntityError::ParameterError(format!("no value supplied for {name}"))
            })?,
            None => {
                let param = params.get(*positional).ok_or_else(|| {
                    SqlEntityError::ParameterError(format!(
                        "no value supplied for positional parameter {}",
                        *positional + 1
                    ))
                })?;
                *positional += 1;
                param
            }
        };
        stmt.raw_bind_parameter(idx, row_value_to_sqlite_value(&param.value))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    #[test]
    fn binds_named_parameters_regardless_of_sigil_and_case() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT @Name || :age").unwrap();
        let params = vec![Param::new("name", "Rina"), Param::new("@AGE", 30)];
        let mut positional = 0;
        bind_statement(&mut stmt, &params, &mut positional).unwrap();
        let mut rows = stmt.raw_query();
        let row = rows.next().unwrap().unwrap();
        assert_eq!(row.get::<_, String>(0).unwrap(), "Rina30");
        assert_eq!(positional, 0);
    }

    #[test]
    fn missing_named_parameter_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT @missing").unwrap();
        let mut positional = 0;
        let err = bind_statement(&mut stmt, &[], &mut positional).unwrap_err();
        assert!(matches!(err, SqlEntityError::ParameterError(msg) if msg.contains("@missing")));
    }

    #[test]
    fn positional_parameters_advance_the_cursor() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT ?, ?").unwrap();
        let params = vec![Param::new("a", 1), Param::new("b", 2), Param::new("c", 3)];
        let mut positional = 1;
        bind_statement(&mut stmt, &params, &mut positional).unwrap();
        assert_eq!(positional, 3);
    }
}

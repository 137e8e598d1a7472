//! Command execution and row mapping on top of [`Session`].

use crate::binder::{ParamBag, bind_bag, bind_parameters};
use crate::coerce::CoerceOptions;
use crate::config::ProfileConfig;
use crate::entity::Entity;
use crate::error::SqlEntityError;
use crate::query::{Command, CommandKind};
use crate::results::{DbRow, ResultSet};
use crate::session::Session;
use crate::sqlite::query::run_script;
use crate::statement::build_statement;
use crate::types::{QueryIntent, RowValues};

/// SQL text to run for `command`; procedures come from the profile catalogue.
fn resolve_sql(profile: &str, config: &ProfileConfig, command: &Command) -> Result<String, SqlEntityError> {
    match command.kind {
        CommandKind::Text => Ok(command.sql.clone()),
        CommandKind::Procedure => config.procedure(&command.sql).map(str::to_owned).ok_or_else(|| {
            SqlEntityError::ConfigError(format!(
                "profile {profile:?} has no procedure named {:?}",
                command.sql
            ))
        }),
    }
}

/// Apply `mapper` to every row; a mapper error names the failing row.
fn map_result_set<T, F>(rows: &ResultSet, mut mapper: F) -> Result<Vec<T>, SqlEntityError>
where
    F: FnMut(&DbRow) -> Result<T, SqlEntityError>,
{
    rows.iter()
        .enumerate()
        .map(|(row_index, row)| {
            mapper(row).map_err(|e| {
                SqlEntityError::operation_failed(format!("Failed map row {row_index}"), e)
            })
        })
        .collect()
}

/// Map `rows` onto `T`, resolving each property's column once.
///
/// Properties without a matching column keep the coerced default.
fn map_rows<T: Entity>(
    rows: &ResultSet,
    options: &CoerceOptions,
) -> Result<Vec<T>, SqlEntityError> {
    let descriptor = T::descriptor();
    let columns: Vec<(&'static str, Option<usize>)> = {
        let names = rows.get_column_names();
        descriptor
            .properties()
            .iter()
            .filter(|p| !p.not_mapped)
            .map(|p| {
                let column = p.column_name();
                let idx = names.and_then(|names| {
                    names
                        .iter()
                        .position(|n| n == column)
                        .or_else(|| names.iter().position(|n| n.eq_ignore_ascii_case(column)))
                });
                if idx.is_none() {
                    tracing::debug!(
                        entity = descriptor.type_name(),
                        column,
                        "column missing from result; property left at default"
                    );
                }
                (p.name, idx)
            })
            .collect()
    };

    map_result_set(rows, |row| {
        let mut entity = T::default();
        for (property, idx) in &columns {
            let value = idx
                .and_then(|i| row.get_by_index(i))
                .unwrap_or(&RowValues::Null);
            if !entity.set_value(property, value, options) {
                return Err(SqlEntityError::ExecutionError(format!(
                    "property {property} of {} has no setter",
                    descriptor.type_name()
                )));
            }
        }
        Ok(entity)
    })
}

impl Session {
    async fn run(
        &self,
        profile: &str,
        command: Command,
    ) -> Result<crate::sqlite::query::ScriptOutcome, SqlEntityError> {
        let config = self.profile(profile)?;
        let sql = resolve_sql(profile, &config, &command)?;
        let params = command.params;
        tracing::debug!(context = self.id().get(), profile, sql = %sql, "executing command");
        self.with_connection(profile, move |conn| run_script(conn, &sql, &params))
            .await
    }

    /// Run `command` and return a single value: the first column of the
    /// first row of the first statement that returns rows, or else the number
    /// of rows changed.
    ///
    /// # Errors
    /// `ConfigError` for an unknown profile or procedure; `OperationFailed`
    /// wrapping any database or parameter failure.
    pub async fn execute(
        &self,
        profile: &str,
        command: impl Into<Command>,
    ) -> Result<RowValues, SqlEntityError> {
        Ok(self.run(profile, command.into()).await?.scalar())
    }

    /// Run `command` and return the rows of its first result.
    ///
    /// # Errors
    /// Same as [`Session::execute`].
    pub async fn query(
        &self,
        profile: &str,
        command: impl Into<Command>,
    ) -> Result<ResultSet, SqlEntityError> {
        Ok(self
            .run(profile, command.into())
            .await?
            .first_result
            .unwrap_or_default())
    }

    /// Run `command` and map each row onto `T` with default coercion options.
    ///
    /// # Errors
    /// Same as [`Session::execute`], plus `OperationFailed` naming the row
    /// when a property cannot be set.
    pub async fn query_as<T: Entity>(
        &self,
        profile: &str,
        command: impl Into<Command>,
    ) -> Result<Vec<T>, SqlEntityError> {
        self.query_as_with(profile, command, &CoerceOptions::default())
            .await
    }

    /// Run `command` and turn each row into a `T` with `mapper`.
    ///
    /// # Errors
    /// Same as [`Session::execute`], plus `OperationFailed` naming the row
    /// when `mapper` fails.
    pub async fn query_map<T, F>(
        &self,
        profile: &str,
        command: impl Into<Command>,
        mapper: F,
    ) -> Result<Vec<T>, SqlEntityError>
    where
        F: FnMut(&DbRow) -> Result<T, SqlEntityError>,
    {
        let rows = self.query(profile, command).await?;
        map_result_set(&rows, mapper)
    }

    /// [`Session::query_as`] with explicit coercion options.
    ///
    /// # Errors
    /// Same as [`Session::query_as`].
    pub async fn query_as_with<T: Entity>(
        &self,
        profile: &str,
        command: impl Into<Command>,
        options: &CoerceOptions,
    ) -> Result<Vec<T>, SqlEntityError> {
        let rows = self.query(profile, command).await?;
        map_rows(&rows, options)
    }

    /// Insert `entity`; a generated identity is written back onto it.
    /// Returns the identity query's value.
    ///
    /// # Errors
    /// Same as [`Session::execute`].
    pub async fn insert<T: Entity>(
        &self,
        profile: &str,
        entity: &mut T,
    ) -> Result<RowValues, SqlEntityError> {
        let dialect = self.profile(profile)?.dialect;
        let sql = build_statement::<T>(QueryIntent::Insert, dialect)?;
        let params = bind_parameters(entity, QueryIntent::Insert);
        let identity = self
            .execute(profile, Command::text(sql).with_params(params))
            .await?;
        if let Some(property) = T::descriptor().identity() {
            entity.set_value(property.name, &identity, &CoerceOptions::default());
        }
        Ok(identity)
    }

    /// Update `entity` by key. Returns the number of rows changed.
    ///
    /// # Errors
    /// `ConfigError` when `T` has no key; otherwise as [`Session::execute`].
    pub async fn update<T: Entity>(&self, profile: &str, entity: &T) -> Result<i64, SqlEntityError> {
        self.write_by_key(profile, entity, QueryIntent::Update).await
    }

    /// Delete `entity` by key. Returns the number of rows removed.
    ///
    /// # Errors
    /// `ConfigError` when `T` has no key; otherwise as [`Session::execute`].
    pub async fn delete<T: Entity>(&self, profile: &str, entity: &T) -> Result<i64, SqlEntityError> {
        self.write_by_key(profile, entity, QueryIntent::Delete).await
    }

    async fn write_by_key<T: Entity>(
        &self,
        profile: &str,
        entity: &T,
        intent: QueryIntent,
    ) -> Result<i64, SqlEntityError> {
        let dialect = self.profile(profile)?.dialect;
        let sql = build_statement::<T>(intent, dialect)?;
        let params = bind_parameters(entity, intent);
        let changed = self
            .execute(profile, Command::text(sql).with_params(params))
            .await?;
        Ok(changed.as_int().copied().unwrap_or_default())
    }

    /// Insert each entity in turn. Returns each row's identity, in order.
    ///
    /// # Errors
    /// `ArgumentNull` for an empty slice; otherwise the first failing insert.
    pub async fn insert_many<T: Entity>(
        &self,
        profile: &str,
        entities: &mut [T],
    ) -> Result<Vec<RowValues>, SqlEntityError> {
        if entities.is_empty() {
            return Err(SqlEntityError::ArgumentNull(
                "no entities to insert".into(),
            ));
        }
        let mut identities = Vec::with_capacity(entities.len());
        for entity in entities.iter_mut() {
            identities.push(self.insert(profile, entity).await?);
        }
        Ok(identities)
    }

    /// Run `sql` once per parameter source, binding with `intent`'s
    /// exclusions. Returns each call's value.
    ///
    /// # Errors
    /// `ArgumentNull` for no sources; otherwise the first failing call.
    pub async fn execute_many(
        &self,
        profile: &str,
        sql: &str,
        bags: &[ParamBag],
        intent: QueryIntent,
    ) -> Result<Vec<RowValues>, SqlEntityError> {
        if bags.is_empty() {
            return Err(SqlEntityError::ArgumentNull(
                "no parameter sources".into(),
            ));
        }
        let mut out = Vec::with_capacity(bags.len());
        for bag in bags {
            let command = Command::text(sql).with_params(bind_bag(bag, intent));
            out.push(self.execute(profile, command).await?);
        }
        Ok(out)
    }

    /// [`Session::execute`] on the default profile.
    ///
    /// # Errors
    /// As `execute`, plus `ConfigError` without a default profile.
    pub async fn execute_default(
        &self,
        command: impl Into<Command>,
    ) -> Result<RowValues, SqlEntityError> {
        let profile = self.default_profile()?;
        self.execute(&profile, command).await
    }

    /// [`Session::query`] on the default profile.
    ///
    /// # Errors
    /// As `query`, plus `ConfigError` without a default profile.
    pub async fn query_default(
        &self,
        command: impl Into<Command>,
    ) -> Result<ResultSet, SqlEntityError> {
        let profile = self.default_profile()?;
        self.query(&profile, command).await
    }

    /// [`Session::insert`] on the default profile.
    ///
    /// # Errors
    /// As `insert`, plus `ConfigError` without a default profile.
    pub async fn insert_default<T: Entity>(&self, entity: &mut T) -> Result<RowValues, SqlEntityError> {
        let profile = self.default_profile()?;
        self.insert(&profile, entity).await
    }

    /// # Errors
    /// As `update`, plus `ConfigError` without a default profile.
    pub async fn update_default<T: Entity>(&self, entity: &T) -> Result<i64, SqlEntityError> {
        let profile = self.default_profile()?;
        self.update(&profile, entity).await
    }

    /// # Errors
    /// As `delete`, plus `ConfigError` without a default profile.
    pub async fn delete_default<T: Entity>(&self, entity: &T) -> Result<i64, SqlEntityError> {
        let profile = self.default_profile()?;
        self.delete(&profile, entity).await
    }

    /// [`Session::query_map`] on the default profile.
    ///
    /// # Errors
    /// As `query_map`, plus `ConfigError` without a default profile.
    pub async fn query_map_default<T, F>(
        &self,
        command: impl Into<Command>,
        mapper: F,
    ) -> Result<Vec<T>, SqlEntityError>
    where
        F: FnMut(&DbRow) -> Result<T, SqlEntityError>,
    {
        let profile = self.default_profile()?;
        self.query_map(&profile, command, mapper).await
    }

    /// [`Session::query_as`] on the default profile.
    ///
    /// # Errors
    /// As `query_as`, plus `ConfigError` without a default profile.
    pub async fn query_as_default<T: Entity>(
        &self,
        command: impl Into<Command>,
    ) -> Result<Vec<T>, SqlEntityError> {
        let profile = self.default_profile()?;
        self.query_as(&profile, command).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::impl_entity;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i64,
        name: String,
        nickname: Option<String>,
    }

    impl_entity!(Person { id: i64 => [key, identity], name: String, nickname: Option<String> });

    fn rows(columns: &[&str], data: Vec<Vec<RowValues>>) -> ResultSet {
        let mut rs = ResultSet::with_capacity(data.len());
        rs.set_column_names(Arc::new(columns.iter().map(|c| (*c).to_owned()).collect()));
        for row in data {
            rs.add_row_values(row);
        }
        rs
    }

    #[test]
    fn maps_rows_and_defaults_missing_columns() {
        let rs = rows(
            &["ID", "name"],
            vec![vec![RowValues::Text("5".into()), RowValues::Text("Ana".into())]],
        );
        let people: Vec<Person> = map_rows(&rs, &CoerceOptions::default()).unwrap();
        assert_eq!(
            people,
            [Person {
                id: 5,
                name: "Ana".into(),
                nickname: None
            }]
        );
    }

    #[test]
    fn mapper_failure_names_the_row() {
        let rs = rows(
            &["name"],
            vec![
                vec![RowValues::Text("Ana".into())],
                vec![RowValues::Null],
            ],
        );
        let err = map_result_set(&rs, |row| {
            row.get("name")
                .and_then(RowValues::as_text)
                .map(str::to_owned)
                .ok_or_else(|| SqlEntityError::ExecutionError("name is null".into()))
        })
        .unwrap_err();
        match &err {
            SqlEntityError::OperationFailed { message, .. } => {
                assert_eq!(message, "Failed map row 1");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(err.root_cause(), SqlEntityError::ExecutionError(_)));
    }

    #[test]
    fn unknown_procedure_is_a_configuration_error() {
        let config = ProfileConfig::new(":memory:").with_procedure("Ping", "SELECT 1");
        assert_eq!(
            resolve_sql("main", &config, &Command::procedure("ping")).unwrap(),
            "SELECT 1"
        );
        let err = resolve_sql("main", &config, &Command::procedure("Pong")).unwrap_err();
        assert!(matches!(err, SqlEntityError::ConfigError(_)));
    }
}

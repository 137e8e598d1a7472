//! Connection profiles and where they come from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SqlEntityError;
use crate::types::Dialect;

/// Environment variable naming the default profile.
pub const DEFAULT_PROFILE_VAR: &str = "SQL_ENTITY_DEFAULT_PROFILE";
/// Prefix of per-profile environment variables, e.g. `SQL_ENTITY_PROFILE_MAIN`.
pub const PROFILE_VAR_PREFIX: &str = "SQL_ENTITY_PROFILE_";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Resolves profile names to connection settings.
pub trait ProfileSource: Send + Sync {
    fn profile(&self, name: &str) -> Option<ProfileConfig>;

    /// Name used by the default-profile variants of session operations.
    fn default_profile(&self) -> Option<String>;
}

/// Where a `SQLite` connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    Path(PathBuf),
    /// A `file:` URI, opened with URI handling enabled.
    Uri(String),
}

/// Settings for one named connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// A path, `:memory:`, a `file:` URI or `Data Source=...;` pairs.
    pub connection_string: String,
    /// Must be `Sqlite` for the profile to execute anything; other dialects
    /// are refused with a `ConfigError` before a connection is opened.
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    /// Procedure name to SQL body. `SQLite` has no stored procedures, so
    /// procedure commands are looked up here.
    #[serde(default)]
    pub procedures: HashMap<String, String>,
}

impl ProfileConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            dialect: Dialect::default(),
            busy_timeout_ms: None,
            procedures: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_procedure(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.procedures.insert(name.into(), sql.into());
        self
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS))
    }

    /// Body of procedure `name`, matched exactly first and then ignoring case.
    #[must_use]
    pub fn procedure(&self, name: &str) -> Option<&str> {
        self.procedures
            .get(name)
            .or_else(|| {
                self.procedures
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Parse the connection string.
    ///
    /// # Errors
    ///
    /// Returns `SqlEntityError::ConfigError` for an empty string or a
    /// key/value string without a data source.
    pub fn target(&self) -> Result<SqliteTarget, SqlEntityError> {
        parse_connection_string(&self.connection_string)
    }
}

/// Interpret a `SQLite` connection string.
///
/// # Errors
///
/// Returns `SqlEntityError::ConfigError` when no database location can be found.
pub fn parse_connection_string(raw: &str) -> Result<SqliteTarget, SqlEntityError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(SqlEntityError::ConfigError(
            "connection string is empty".into(),
        ));
    }
    if value.eq_ignore_ascii_case(":memory:") {
        return Ok(SqliteTarget::Memory);
    }
    if value.starts_with("file:") {
        return Ok(SqliteTarget::Uri(value.to_owned()));
    }
    if value.contains('=') {
        let source = value
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| {
                let key: String = key.split_whitespace().collect();
                key.eq_ignore_ascii_case("datasource") || key.eq_ignore_ascii_case("filename")
            })
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SqlEntityError::ConfigError(format!(
                    "connection string has no Data Source: {value}"
                ))
            })?;
        return parse_connection_string(source);
    }
    Ok(SqliteTarget::Path(PathBuf::from(value)))
}

/// Profiles held in memory, usually loaded from JSON.
///
/// ```rust
/// use sql_entity::config::{ConnectionConfig, ProfileSource};
///
/// let config = ConnectionConfig::from_json_str(r#"{
///     "default_profile": "main",
///     "profiles": { "main": { "connection_string": ":memory:" } }
/// }"#)?;
/// assert_eq!(config.default_profile().as_deref(), Some("main"));
/// # Ok::<(), sql_entity::SqlEntityError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
}

impl ConnectionConfig {
    #[must_use]
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            config: ConnectionConfig::default(),
        }
    }

    /// # Errors
    ///
    /// Returns `SqlEntityError::ConfigError` when the JSON does not describe
    /// a configuration.
    pub fn from_json_str(json: &str) -> Result<Self, SqlEntityError> {
        serde_json::from_str(json)
            .map_err(|e| SqlEntityError::ConfigError(format!("invalid connection config: {e}")))
    }

    /// # Errors
    ///
    /// Returns `SqlEntityError::ConfigError` when the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlEntityError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SqlEntityError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}

impl ProfileSource for ConnectionConfig {
    fn profile(&self, name: &str) -> Option<ProfileConfig> {
        self.profiles.get(name).cloned()
    }

    fn default_profile(&self) -> Option<String> {
        self.default_profile.clone().or_else(|| {
            (self.profiles.len() == 1)
                .then(|| self.profiles.keys().next().cloned())
                .flatten()
        })
    }
}

/// Fluent builder for [`ConnectionConfig`].
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    #[must_use]
    pub fn profile(mut self, name: impl Into<String>, profile: ProfileConfig) -> Self {
        self.config.profiles.insert(name.into(), profile);
        self
    }

    #[must_use]
    pub fn default_profile(mut self, name: impl Into<String>) -> Self {
        self.config.default_profile = Some(name.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionConfig {
        self.config
    }
}

/// Profiles read from environment variables.
///
/// `SQL_ENTITY_PROFILE_<NAME>` holds either a bare connection string or a
/// JSON [`ProfileConfig`]; `<NAME>` is the profile name upper-cased with
/// non-alphanumerics turned into `_`.
#[derive(Debug, Clone, Default)]
pub struct EnvProfileSource {
    overrides: Option<HashMap<String, String>>,
}

impl EnvProfileSource {
    /// Read from the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from a fixed set of variables instead of the environment.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            overrides: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        match &self.overrides {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
    }

    fn variable_for(name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{PROFILE_VAR_PREFIX}{suffix}")
    }
}

impl ProfileSource for EnvProfileSource {
    fn profile(&self, name: &str) -> Option<ProfileConfig> {
        let raw = self.var(&Self::variable_for(name))?;
        let raw = raw.trim();
        if raw.starts_with('{') {
            match serde_json::from_str(raw) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!(profile = name, error = %e, "ignoring malformed profile JSON");
                    None
                }
            }
        } else {
            Some(ProfileConfig::new(raw))
        }
    }

    fn default_profile(&self) -> Option<String> {
        self.var(DEFAULT_PROFILE_VAR).filter(|v| !v.trim().is_empty())
    }
}

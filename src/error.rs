use thiserror::Error;

/// Coarse classification of a [`SqlEntityError`].
///
/// Callers that only care about "whose fault was it" can branch on the kind
/// instead of matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown profile, missing key metadata, unknown procedure.
    Configuration,
    /// A required argument was missing.
    ArgumentNull,
    /// An argument was present but unusable (primitive where a record is required, etc.).
    ArgumentNotValid,
    /// The database rejected or failed an operation.
    OperationFailed,
    /// Raw driver error that has not been wrapped yet.
    Database,
}

#[derive(Debug, Error)]
pub enum SqlEntityError {
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Argument is null: {0}")]
    ArgumentNull(String),

    #[error("Argument not valid: {0}")]
    ArgumentNotValid(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("{message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Box<SqlEntityError>,
    },
}

impl SqlEntityError {
    /// Wrap `source` as an operation failure with a caller-facing message.
    pub fn operation_failed(message: impl Into<String>, source: SqlEntityError) -> Self {
        SqlEntityError::OperationFailed {
            message: message.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SqlEntityError::ConfigError(_) => ErrorKind::Configuration,
            SqlEntityError::ArgumentNull(_) => ErrorKind::ArgumentNull,
            SqlEntityError::ArgumentNotValid(_) | SqlEntityError::ParameterError(_) => {
                ErrorKind::ArgumentNotValid
            }
            SqlEntityError::OperationFailed { .. } => ErrorKind::OperationFailed,
            SqlEntityError::SqliteError(_)
            | SqlEntityError::ConnectionError(_)
            | SqlEntityError::ExecutionError(_) => ErrorKind::Database,
        }
    }

    /// The innermost error beneath any `OperationFailed` wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &SqlEntityError {
        match self {
            SqlEntityError::OperationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<tokio::task::JoinError> for SqlEntityError {
    fn from(err: tokio::task::JoinError) -> Self {
        SqlEntityError::ExecutionError(format!("sqlite spawn_blocking join error: {err}"))
    }
}

use std::sync::Arc;

use rusqlite::{Connection, OpenFlags};
use tokio::sync::Mutex;

use crate::config::{ProfileConfig, SqliteTarget};
use crate::error::SqlEntityError;
use crate::types::{Dialect, IsolationLevel};

/// A `SQLite` handle shared between the async side and blocking workers.
pub(crate) type SharedSqliteConnection = Arc<Mutex<Connection>>;

fn open_blocking(profile: &ProfileConfig) -> Result<Connection, SqlEntityError> {
    let conn = match profile.target()? {
        SqliteTarget::Memory => Connection::open_in_memory(),
        SqliteTarget::Path(path) => Connection::open(&path),
        SqliteTarget::Uri(uri) => Connection::open_with_flags(
            uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
    }
    .map_err(|e| {
        SqlEntityError::ConnectionError(format!(
            "cannot open {}: {e}",
            profile.connection_string
        ))
    })?;
    conn.busy_timeout(profile.busy_timeout())?;
    Ok(conn)
}

/// Open a connection for `profile` on a blocking worker.
///
/// # Errors
/// Returns `SqlEntityError::ConfigError` for a profile whose dialect is not
/// `SQLite` or whose connection string is invalid, and another
/// `SqlEntityError` if the file cannot be opened.
pub(crate) async fn open_connection(
    profile: ProfileConfig,
) -> Result<SharedSqliteConnection, SqlEntityError> {
    if profile.dialect != Dialect::Sqlite {
        return Err(SqlEntityError::ConfigError(format!(
            "profile dialect {:?} cannot run on the SQLite backend",
            profile.dialect
        )));
    }
    let conn = tokio::task::spawn_blocking(move || open_blocking(&profile)).await??;
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlEntityError>
where
    F: FnOnce(&mut Connection) -> Result<R, SqlEntityError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await?
}

/// Close `conn` if this is the last handle to it; otherwise just drop it.
pub(crate) async fn close_connection(conn: SharedSqliteConnection) {
    let Ok(mutex) = Arc::try_unwrap(conn) else {
        return;
    };
    let closed = tokio::task::spawn_blocking(move || mutex.into_inner().close()).await;
    match closed {
        Ok(Ok(())) => {}
        Ok(Err((_, e))) => tracing::warn!(error = %e, "sqlite close failed"),
        Err(e) => tracing::warn!(error = %e, "sqlite close task failed"),
    }
}

/// Statement that opens a transaction at `level`.
///
/// `SQLite` only distinguishes dirty reads (shared-cache mode) and write
/// locking at BEGIN, so the remaining levels share a deferred BEGIN.
#[must_use]
pub(crate) fn begin_sql(level: IsolationLevel) -> &'static str {
    match level {
        IsolationLevel::ReadUncommitted => "PRAGMA read_uncommitted = 1; BEGIN DEFERRED;",
        IsolationLevel::ReadCommitted
        | IsolationLevel::RepeatableRead
        | IsolationLevel::Snapshot => "PRAGMA read_uncommitted = 0; BEGIN DEFERRED;",
        IsolationLevel::Serializable => "PRAGMA read_uncommitted = 0; BEGIN IMMEDIATE;",
    }
}

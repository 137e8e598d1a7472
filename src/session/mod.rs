//! Per-context connection and transaction lifecycle.
//!
//! A [`Database`] hands out [`Session`]s. Each session owns at most one
//! connection and one transaction per profile; sessions never share
//! connections. Outside a transaction every call opens a connection, runs,
//! and closes it again.

mod tx;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{ConnectionConfig, ProfileConfig, ProfileSource};
use crate::error::SqlEntityError;
use crate::sqlite::connection::{
    SharedSqliteConnection, close_connection, open_connection, run_blocking,
};
use crate::types::IsolationLevel;

/// Identity of one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

type SlotKey = (ContextId, String);

#[derive(Debug)]
struct Slot {
    conn: SharedSqliteConnection,
    tx: Option<IsolationLevel>,
}

struct DatabaseInner {
    source: Arc<dyn ProfileSource>,
    profiles: Mutex<HashMap<String, ProfileConfig>>,
    slots: Mutex<HashMap<SlotKey, Slot>>,
    next_context: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Entry point: profile resolution plus the connection slots of every session.
///
/// ```rust,no_run
/// use sql_entity::prelude::*;
///
/// # async fn demo() -> Result<(), SqlEntityError> {
/// let config = ConnectionConfig::builder()
///     .profile("main", ProfileConfig::new("app.db"))
///     .default_profile("main")
///     .finish();
/// let db = Database::new(config);
/// let session = db.session();
/// session.begin_transaction("main", IsolationLevel::Serializable).await?;
/// session.execute("main", "UPDATE counters SET n = n + 1").await?;
/// session.end_transaction("main").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("open_slots", &lock(&self.inner.slots).len())
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn new(source: impl ProfileSource + 'static) -> Self {
        Self::with_source(Arc::new(source))
    }

    #[must_use]
    pub fn with_source(source: Arc<dyn ProfileSource>) -> Self {
        Database {
            inner: Arc::new(DatabaseInner {
                source,
                profiles: Mutex::new(HashMap::new()),
                slots: Mutex::new(HashMap::new()),
                next_context: AtomicU64::new(1),
            }),
        }
    }

    /// Load profiles from a JSON file.
    ///
    /// # Errors
    /// Returns `SqlEntityError::ConfigError` if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self, SqlEntityError> {
        Ok(Self::new(ConnectionConfig::from_json_file(path)?))
    }

    /// A fresh execution context.
    #[must_use]
    pub fn session(&self) -> Session {
        let id = ContextId(self.inner.next_context.fetch_add(1, Ordering::Relaxed));
        Session {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    /// Settings for `name`, cached after the first lookup.
    ///
    /// # Errors
    /// Returns `SqlEntityError::ConfigError` for an unknown profile.
    pub fn profile(&self, name: &str) -> Result<ProfileConfig, SqlEntityError> {
        self.inner.profile(name)
    }

    /// Name of the default profile.
    ///
    /// # Errors
    /// Returns `SqlEntityError::ConfigError` when none is configured.
    pub fn default_profile(&self) -> Result<String, SqlEntityError> {
        self.inner.default_profile()
    }

    /// Number of connections currently held across all sessions.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        lock(&self.inner.slots).len()
    }
}

impl DatabaseInner {
    fn profile(&self, name: &str) -> Result<ProfileConfig, SqlEntityError> {
        if let Some(profile) = lock(&self.profiles).get(name) {
            return Ok(profile.clone());
        }
        let profile = self
            .source
            .profile(name)
            .ok_or_else(|| SqlEntityError::ConfigError(format!("unknown profile {name:?}")))?;
        lock(&self.profiles).insert(name.to_owned(), profile.clone());
        Ok(profile)
    }

    fn default_profile(&self) -> Result<String, SqlEntityError> {
        self.source
            .default_profile()
            .ok_or_else(|| SqlEntityError::ConfigError("no default profile configured".into()))
    }
}

/// An explicit execution context. Dropping it releases its connections;
/// `SQLite` rolls back any transaction still open on them.
pub struct Session {
    inner: Arc<DatabaseInner>,
    id: ContextId,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

impl Session {
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Settings for `profile` as seen by this session.
    ///
    /// # Errors
    /// Returns `SqlEntityError::ConfigError` for an unknown profile.
    pub fn profile(&self, profile: &str) -> Result<ProfileConfig, SqlEntityError> {
        self.inner.profile(profile)
    }

    /// Name of the default profile.
    ///
    /// # Errors
    /// Returns `SqlEntityError::ConfigError` when none is configured.
    pub fn default_profile(&self) -> Result<String, SqlEntityError> {
        self.inner.default_profile()
    }

    fn key(&self, profile: &str) -> SlotKey {
        (self.id, profile.to_owned())
    }

    /// Whether a transaction is active on `profile` in this session.
    #[must_use]
    pub fn is_transaction_started(&self, profile: &str) -> bool {
        lock(&self.inner.slots)
            .get(&self.key(profile))
            .is_some_and(|slot| slot.tx.is_some())
    }

    fn slot_handle(&self, profile: &str) -> Option<(SharedSqliteConnection, bool)> {
        lock(&self.inner.slots)
            .get(&self.key(profile))
            .map(|slot| (Arc::clone(&slot.conn), slot.tx.is_some()))
    }

    /// Existing connection for `profile`, or a newly opened one registered
    /// in the slot map.
    async fn acquire(&self, profile: &str) -> Result<(SharedSqliteConnection, bool), SqlEntityError> {
        if let Some(existing) = self.slot_handle(profile) {
            return Ok(existing);
        }
        let config = self.inner.profile(profile)?;
        let conn = open_connection(config).await?;
        tracing::debug!(context = self.id.0, profile, "sqlite connection opened");
        lock(&self.inner.slots).insert(
            self.key(profile),
            Slot {
                conn: Arc::clone(&conn),
                tx: None,
            },
        );
        Ok((conn, false))
    }

    /// Remove and close the connection for `profile`.
    async fn release(&self, profile: &str) {
        let slot = lock(&self.inner.slots).remove(&self.key(profile));
        if let Some(slot) = slot {
            tracing::debug!(context = self.id.0, profile, "sqlite connection closed");
            close_connection(slot.conn).await;
        }
    }

    /// Run `func` against the connection for `profile`.
    ///
    /// Outside a transaction the connection is closed afterwards. On failure
    /// an active transaction is rolled back, the connection closed and the
    /// cause wrapped in `OperationFailed`.
    pub(crate) async fn with_connection<F, R>(
        &self,
        profile: &str,
        func: F,
    ) -> Result<R, SqlEntityError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlEntityError> + Send + 'static,
        R: Send + 'static,
    {
        let (conn, in_tx) = match self.acquire(profile).await {
            Ok(handle) => handle,
            Err(e @ SqlEntityError::ConfigError(_)) => return Err(e),
            Err(e) => return Err(SqlEntityError::operation_failed("Failed open connection", e)),
        };
        match run_blocking(Arc::clone(&conn), func).await {
            Ok(value) => {
                drop(conn);
                if !in_tx {
                    self.release(profile).await;
                }
                Ok(value)
            }
            Err(e) => {
                if in_tx {
                    tracing::warn!(context = self.id.0, profile, error = %e, "rolling back after failure");
                    if let Err(rollback_err) = tx::rollback_on(Arc::clone(&conn)).await {
                        tracing::warn!(error = %rollback_err, "rollback after failure failed");
                    }
                }
                drop(conn);
                self.release(profile).await;
                Err(SqlEntityError::operation_failed("Failed execute query", e))
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let mut slots = lock(&self.inner.slots);
        let before = slots.len();
        slots.retain(|(context, _), _| *context != self.id);
        let released = before - slots.len();
        if released > 0 {
            tracing::debug!(context = self.id.0, released, "session dropped with open connections");
        }
    }
}

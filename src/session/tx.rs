use std::sync::Arc;

use super::{Session, lock};
use crate::error::SqlEntityError;
use crate::sqlite::connection::{SharedSqliteConnection, begin_sql, run_blocking};
use crate::types::IsolationLevel;

pub(super) async fn rollback_on(conn: SharedSqliteConnection) -> Result<(), SqlEntityError> {
    run_blocking(conn, |c| {
        if c.is_autocommit() {
            return Ok(());
        }
        c.execute_batch("ROLLBACK;").map_err(SqlEntityError::from)
    })
    .await
}

async fn commit_on(conn: SharedSqliteConnection) -> Result<(), SqlEntityError> {
    run_blocking(conn, |c| c.execute_batch("COMMIT;").map_err(SqlEntityError::from)).await
}

impl Session {
    /// Start a transaction on `profile`. A second call while one is active
    /// does nothing.
    ///
    /// # Errors
    /// Returns `SqlEntityError::ConfigError` for an unknown profile and
    /// `SqlEntityError::OperationFailed` when the connection cannot be
    /// opened or BEGIN fails.
    pub async fn begin_transaction(
        &self,
        profile: &str,
        isolation: IsolationLevel,
    ) -> Result<(), SqlEntityError> {
        if self.is_transaction_started(profile) {
            return Ok(());
        }
        let (conn, _) = match self.acquire(profile).await {
            Ok(handle) => handle,
            Err(e @ SqlEntityError::ConfigError(_)) => return Err(e),
            Err(e) => {
                return Err(SqlEntityError::operation_failed("Failed begin transaction", e));
            }
        };
        let sql = begin_sql(isolation);
        let begun = run_blocking(Arc::clone(&conn), move |c| {
            c.execute_batch(sql).map_err(SqlEntityError::from)
        })
        .await;
        drop(conn);
        match begun {
            Ok(()) => {
                if let Some(slot) = lock(&self.inner.slots).get_mut(&self.key(profile)) {
                    slot.tx = Some(isolation);
                }
                tracing::debug!(context = self.id.0, profile, ?isolation, "transaction started");
                Ok(())
            }
            Err(e) => {
                self.release(profile).await;
                Err(SqlEntityError::operation_failed("Failed begin transaction", e))
            }
        }
    }

    /// Take the transactional connection for `profile` out of the slot map.
    fn take_transaction(&self, profile: &str) -> Option<SharedSqliteConnection> {
        let mut slots = lock(&self.inner.slots);
        let key = self.key(profile);
        if slots.get(&key).is_some_and(|slot| slot.tx.is_some()) {
            slots.remove(&key).map(|slot| slot.conn)
        } else {
            None
        }
    }

    /// Commit and close. Returns `false` when no transaction was active.
    ///
    /// # Errors
    /// Returns `SqlEntityError::OperationFailed` if COMMIT fails; the
    /// connection is closed either way.
    pub async fn commit(&self, profile: &str) -> Result<bool, SqlEntityError> {
        let Some(conn) = self.take_transaction(profile) else {
            return Ok(false);
        };
        let result = commit_on(Arc::clone(&conn)).await;
        crate::sqlite::connection::close_connection(conn).await;
        tracing::debug!(context = self.id.0, profile, ok = result.is_ok(), "transaction committed");
        result
            .map(|()| true)
            .map_err(|e| SqlEntityError::operation_failed("Failed commit transaction", e))
    }

    /// Roll back and close. Returns `false` when no transaction was active.
    ///
    /// # Errors
    /// Returns `SqlEntityError::OperationFailed` if ROLLBACK fails; the
    /// connection is closed either way.
    pub async fn rollback(&self, profile: &str) -> Result<bool, SqlEntityError> {
        let Some(conn) = self.take_transaction(profile) else {
            return Ok(false);
        };
        let result = rollback_on(Arc::clone(&conn)).await;
        crate::sqlite::connection::close_connection(conn).await;
        tracing::debug!(context = self.id.0, profile, ok = result.is_ok(), "transaction rolled back");
        result
            .map(|()| true)
            .map_err(|e| SqlEntityError::operation_failed("Failed rollback transaction", e))
    }

    /// Commit; if that fails, roll back. The connection is closed either
    /// way. Does nothing when no transaction is active.
    ///
    /// # Errors
    /// Returns `SqlEntityError::OperationFailed` wrapping the commit failure.
    pub async fn end_transaction(&self, profile: &str) -> Result<(), SqlEntityError> {
        let Some(conn) = self.take_transaction(profile) else {
            return Ok(());
        };
        let committed = commit_on(Arc::clone(&conn)).await;
        if let Err(e) = &committed {
            tracing::warn!(context = self.id.0, profile, error = %e, "commit failed, rolling back");
            if let Err(rollback_err) = rollback_on(Arc::clone(&conn)).await {
                tracing::warn!(error = %rollback_err, "rollback after failed commit failed");
            }
        }
        crate::sqlite::connection::close_connection(conn).await;
        committed.map_err(|e| SqlEntityError::operation_failed("Failed end transaction", e))
    }

    /// [`Session::begin_transaction`] on the default profile.
    ///
    /// # Errors
    /// As `begin_transaction`, plus `ConfigError` without a default profile.
    pub async fn begin_default(&self, isolation: IsolationLevel) -> Result<(), SqlEntityError> {
        let profile = self.default_profile()?;
        self.begin_transaction(&profile, isolation).await
    }

    /// [`Session::commit`] on the default profile.
    ///
    /// # Errors
    /// As `commit`, plus `ConfigError` without a default profile.
    pub async fn commit_default(&self) -> Result<bool, SqlEntityError> {
        let profile = self.default_profile()?;
        self.commit(&profile).await
    }

    /// [`Session::rollback`] on the default profile.
    ///
    /// # Errors
    /// As `rollback`, plus `ConfigError` without a default profile.
    pub async fn rollback_default(&self) -> Result<bool, SqlEntityError> {
        let profile = self.default_profile()?;
        self.rollback(&profile).await
    }

    /// [`Session::end_transaction`] on the default profile.
    ///
    /// # Errors
    /// As `end_transaction`, plus `ConfigError` without a default profile.
    pub async fn end_default(&self) -> Result<(), SqlEntityError> {
        let profile = self.default_profile()?;
        self.end_transaction(&profile).await
    }
}

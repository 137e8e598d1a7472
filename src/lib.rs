//! Metadata-driven data access over `SQLite`.
//!
//! Entities describe their table, columns, keys and generated values once
//! (see [`impl_entity!`]). From that description the crate synthesizes
//! INSERT/UPDATE/DELETE statements, binds named parameters, coerces loosely
//! typed column values back into fields and runs everything inside
//! per-[`Session`] connections and transactions.
//!
//! ```rust,no_run
//! use sql_entity::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Employee {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl_entity!(Employee in "Employee" { id: i64 => [key, identity], name: String });
//!
//! # async fn demo() -> Result<(), SqlEntityError> {
//! let db = Database::new(
//!     ConnectionConfig::builder()
//!         .profile("main", ProfileConfig::new("app.db"))
//!         .finish(),
//! );
//! let session = db.session();
//! let mut ana = Employee { id: 0, name: "Ana".into() };
//! session.insert("main", &mut ana).await?;
//! let everyone: Vec<Employee> = session.query_as("main", "SELECT * FROM Employee").await?;
//! # let _ = everyone;
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod coerce;
pub mod config;
pub mod entity;
pub mod error;
mod executor;
pub mod prelude;
pub mod query;
pub mod results;
pub mod session;
pub mod split;
pub mod sqlite;
pub mod statement;
pub mod types;

pub use error::{ErrorKind, SqlEntityError};
pub use query::{Command, CommandKind, Param};
pub use results::{DbRow, ResultSet};
pub use session::{ContextId, Database, Session};
pub use statement::build_statement;
pub use types::{Dialect, IsolationLevel, QueryIntent, RowValues};

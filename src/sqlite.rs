//! `SQLite` backend: connection handles, parameter binding and result building.

pub(crate) mod connection;
pub mod params;
pub mod query;

pub use params::row_value_to_sqlite_value;
pub use query::sqlite_extract_value_sync;

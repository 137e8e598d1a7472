//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types, traits and macros.

pub use crate::binder::{ParamBag, bind_json, bind_parameters, bind_serialize};
pub use crate::coerce::{CoerceOptions, Coercible, Locale, TargetKind, TargetType};
pub use crate::config::{ConnectionConfig, EnvProfileSource, ProfileConfig, ProfileSource};
pub use crate::entity::{Entity, EntityDescriptor, Marker, PropertyDescriptor};
pub use crate::error::{ErrorKind, SqlEntityError};
pub use crate::query::{Command, CommandKind, Param};
pub use crate::results::{DbRow, ResultSet};
pub use crate::session::{Database, Session};
pub use crate::statement::build_statement;
pub use crate::types::{Dialect, IsolationLevel, QueryIntent, RowValues};
pub use crate::{impl_coercible_enum, impl_entity};

//! Convenient imports for typical `entorm` usage.
//!
//! ```ignore
//! use entorm::prelude::*;
//! ```

pub use crate::{
    ConnectionConfig, Cursor, Entity, Executor, Model, OperationKind, OrmError, OrmResult,
    RowSource, Value,
};

#[cfg(feature = "postgres")]
pub use crate::PgExecutor;

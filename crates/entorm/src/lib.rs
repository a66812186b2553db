//! # entorm
//!
//! An entity-first SQL statement builder and row mapper.
//!
//! A plain struct describes a table: its type name becomes the table name and
//! its public fields become columns (both converted to snake_case). A
//! [`Model`] wraps one entity and an [`Executor`], accumulates clauses through
//! a fluent API and compiles them into SQL text plus positional bindings.
//!
//! ## Features
//!
//! - **Entity metadata**: `#[derive(Entity)]` with `#[orm(tag = "...")]` field
//!   tags (`autoPk`, `pk`, `date`, `dateTime`, `time`)
//! - **Clause builder**: select, AND-joined predicates, ordering, pagination
//! - **Statement compiler**: SELECT / INSERT / UPDATE / DELETE / COUNT for the
//!   MySQL and PostgreSQL dialects, with primary-key fallback for UPDATE and
//!   DELETE
//! - **Cursor**: lazy row-to-entity mapping by column name
//! - **PostgreSQL executor** (`postgres` feature): `tokio-postgres` backed
//!
//! ## Example
//!
//! ```ignore
//! use entorm::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! pub struct User {
//!     #[orm(tag = "autoPk")]
//!     pub id: i64,
//!     pub name: String,
//!     pub age: i32,
//!     #[orm(tag = "dateTime")]
//!     pub created_at: Option<chrono::NaiveDateTime>,
//! }
//!
//! let executor = PgExecutor::connect(&ConnectionConfig::from_env()?).await?;
//! let mut users = Model::new(&executor, User::default())?;
//!
//! users.entity_mut().name = "tom".into();
//! let id = users.insert().await?;
//!
//! let tom = users.eq("id", id).first().await?;
//! let page = users.gt("age", 18).order_by_desc("id").paginate(1, 20).await?;
//! ```

extern crate self as entorm;

pub mod builder;
pub mod client;
pub mod config;
pub mod cursor;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod model;
pub mod prelude;
pub mod stmt;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use builder::{
    ClauseBuilder, DEFAULT_PAGE_SIZE, Direction, Operator, OrderClause, Pagination, Predicate,
};
pub use client::{ExecResult, Executor, RawRow, RowSource, VecRows};
pub use config::{ConfigRegistry, ConnectionConfig};
pub use cursor::Cursor;
pub use dialect::Dialect;
pub use entity::{
    AttributeShape, Entity, EntityMeta, EntityShape, FieldDescriptor, ShapeKind, Tag,
    to_snake_case,
};
pub use error::{OrmError, OrmResult};
pub use model::Model;
pub use stmt::{OperationKind, Statement};
pub use value::{FieldValue, SemanticType, TemporalKind, Value};

#[cfg(feature = "postgres")]
pub use postgres::{PgExecutor, PgRows};

#[cfg(feature = "derive")]
pub use entorm_derive::Entity;

//! Error types for entorm

use thiserror::Error;

/// Result type alias for entorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for model construction, statement building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Invalid connection configuration (unknown driver, missing entry)
    #[error("Config error: {0}")]
    Config(String),

    /// Database connection error (open or liveness failure)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The entity shape cannot be mapped to a table
    #[error("Entity shape error: {0}")]
    EntityShape(String),

    /// UPDATE was requested without any fields to update
    #[error("Update error: {0}")]
    Update(String),

    /// Statement could not be built from the current clause state
    #[error("Build error: {0}")]
    Build(String),

    /// Statement compilation was requested without an operation kind
    #[error("Undefined operation: no statement kind was set")]
    UndefinedOperation,

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Query execution error reported by tokio-postgres
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Opaque execution error reported by an executor
    #[error("Execution error: {0}")]
    Execution(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an entity shape error
    pub fn entity_shape(message: impl Into<String>) -> Self {
        Self::EntityShape(message.into())
    }

    /// Create a statement build error
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    /// Create an opaque execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Check if this error was raised while building a statement
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::Update(_) | Self::Build(_) | Self::UndefinedOperation
        )
    }

    /// Check if this is an entity shape error
    pub fn is_entity_shape(&self) -> bool {
        matches!(self, Self::EntityShape(_))
    }

    /// Wrap a tokio_postgres error, classifying connection failures
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Query(err)
    }
}

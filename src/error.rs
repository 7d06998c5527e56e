//! Unified engine error model.
//! One enum covers descriptor compilation, schema synthesis and query execution,
//! with a stable machine code per variant and a SQLSTATE mapping for callers that
//! surface errors over the Postgres protocol.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("field '{field}' has unknown type '{type_name}'")]
    UnknownFieldType { field: String, type_name: String },

    #[error("invalid options for field '{field}': {message}")]
    InvalidFieldOptions { field: String, message: String },

    #[error("invalid metadata for table '{table}': {message}")]
    InvalidMetadata { table: String, message: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("schema change on '{table}' failed: {source}")]
    Schema { table: String, #[source] source: DbError },

    #[error("query on '{table}' failed: {source}")]
    Query { table: String, #[source] source: DbError },

    #[error("connection error: {0}")]
    Connection(#[source] DbError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(what: impl Into<String>) -> Self { EngineError::NotFound { what: what.into() } }
    pub fn invalid_metadata(table: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidMetadata { table: table.into(), message: message.into() }
    }
    pub fn schema(table: impl Into<String>, source: DbError) -> Self { EngineError::Schema { table: table.into(), source } }
    pub fn query(table: impl Into<String>, source: DbError) -> Self { EngineError::Query { table: table.into(), source } }

    pub fn code_str(&self) -> &'static str {
        match self {
            EngineError::UnknownFieldType { .. } => "unknown_field_type",
            EngineError::InvalidFieldOptions { .. } => "invalid_field_options",
            EngineError::InvalidMetadata { .. } => "invalid_metadata",
            EngineError::NotFound { .. } => "not_found",
            EngineError::Schema { .. } => "schema_error",
            EngineError::Query { .. } => "query_error",
            EngineError::Connection(_) => "connection_error",
            EngineError::Config(_) => "config_error",
        }
    }

    /// SQLSTATE for this error. Database failures keep the server's own code when it sent one.
    pub fn sqlstate(&self) -> String {
        match self {
            EngineError::Schema { source, .. } | EngineError::Query { source, .. } => {
                source.code.clone().unwrap_or_else(|| "XX000".to_string())
            }
            EngineError::UnknownFieldType { .. } => "42704".to_string(), // undefined_object
            EngineError::InvalidFieldOptions { .. } | EngineError::InvalidMetadata { .. } => "22023".to_string(), // invalid_parameter_value
            EngineError::NotFound { .. } => "42P01".to_string(), // undefined_table
            EngineError::Connection(_) => "08006".to_string(), // connection_failure
            EngineError::Config(_) => "F0000".to_string(), // config_file_error
        }
    }

    /// True for failures caused by catalog contents rather than the database.
    pub fn is_metadata_error(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownFieldType { .. } | EngineError::InvalidFieldOptions { .. } | EngineError::InvalidMetadata { .. }
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;

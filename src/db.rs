//! Database boundary.
//!
//! Everything the engine sends to PostgreSQL goes through `Connection`. Parameters
//! are bound as text and cast in SQL; result columns are selected as text. That keeps
//! the trait independent of driver type mappings and lets tests swap in
//! `RecordingConnection`.

pub mod postgres;
pub mod recording;

pub use postgres::PgConnection;
pub use recording::RecordingConnection;

use thiserror::Error;

/// One result row, every column rendered as text.
pub type Row = Vec<Option<String>>;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct DbError {
    pub message: String,
    /// SQLSTATE sent by the server, when there was one.
    pub code: Option<String>,
}

impl DbError {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into(), code: None } }
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self { message: message.into(), code: Some(code.into()) }
    }
}

pub trait Connection {
    /// Run one or more statements over the simple protocol, without parameters.
    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError>;
    /// Run a parameterised statement; returns the affected row count.
    fn execute(&mut self, sql: &str, params: &[String]) -> Result<u64, DbError>;
    fn query(&mut self, sql: &str, params: &[String]) -> Result<Vec<Row>, DbError>;

    /// First column of the first row, if any.
    fn query_scalar(&mut self, sql: &str, params: &[String]) -> Result<Option<String>, DbError> {
        Ok(self.query(sql, params)?.into_iter().next().and_then(|row| row.into_iter().next().flatten()))
    }
}


//! Errors raised by the asset, history and directory repositories.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::asset::AssetKey;

/// A stored record that a write expected to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingRecord {
    Asset(AssetKey),
    HistoryEntry(Uuid),
}

impl fmt::Display for MissingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingRecord::Asset(key) => write!(f, "asset {}", key),
            MissingRecord::HistoryEntry(id) => write!(f, "history entry {}", id),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("{0} not found")]
    NotFound(MissingRecord),

    /// Unique key clash, e.g. a second asset row with the same key.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A stored column could not be decoded into its domain type.
    #[error("Stored column {column} is invalid: {reason}")]
    InvalidColumn { column: String, reason: String },

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Invalid database configuration: {0}")]
    Configuration(String),
}

impl DbError {
    pub fn invalid_column(column: &str, reason: impl fmt::Display) -> Self {
        DbError::InvalidColumn {
            column: column.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Constraint(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) => DbError::Query(db_err.message().to_string()),
            sqlx::Error::ColumnDecode { index, source } => DbError::invalid_column(&index, source),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::Configuration(msg) => DbError::Configuration(msg.to_string()),
            sqlx::Error::Io(io_err) => DbError::Connection(io_err.to_string()),
            sqlx::Error::PoolClosed => DbError::Connection("pool closed".to_string()),
            _ => DbError::Query(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

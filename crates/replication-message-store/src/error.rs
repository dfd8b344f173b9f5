//! Message store error types.

use thiserror::Error;

/// Message store error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// A previous holder of the connection panicked
    #[error("Connection lock poisoned")]
    Poisoned,
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

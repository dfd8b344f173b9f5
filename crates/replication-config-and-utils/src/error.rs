//! Errors raised while loading settings and resolving local paths.

use thiserror::Error;

/// Failure to read, write or validate the replication settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings that fail validation, such as a duplicate peer
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An instance URI that does not parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Malformed config file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to root the data directory in
    #[error("Path error: {0}")]
    Path(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

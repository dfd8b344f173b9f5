//! Replication error types.

use thiserror::Error;

/// Error raised by a single transport attempt.
///
/// Every variant is treated as transient by the sender pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (connect, timeout, TLS...)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The peer answered with a non-success status
    #[error("Rejected by peer with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The message could not be encoded for the wire
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Replication error type.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Work could not be accepted (pipeline shut down or gone)
    #[error("Queueing error: {0}")]
    Queueing(String),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A collaborator registry could not be queried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Inbound message is malformed or of an unknown type
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A message handler failed
    #[error("Handler error: {0}")]
    Handler(String),
}

/// Result type alias using ReplicationError.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

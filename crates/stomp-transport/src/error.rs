//! Transport error types.

use thiserror::Error;

/// Errors reported by a broker transport client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),

    /// The broker answered but refused the request (ERROR frame).
    #[error("rejected by broker: {0}")]
    Rejected(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("session closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Convenience alias for transport results.
pub type TransportResult<T> = Result<T, TransportError>;

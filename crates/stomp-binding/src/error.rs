//! Binding error taxonomy and the uniform result envelope.
//!
//! Validation and not-found conditions are caller mistakes and come back as
//! `Err(BindingError)`. Anything the broker or network did wrong is folded
//! into `Outcome::Error`, so callers branch on `status` instead.

use serde::Serialize;
use stomp_protocol::ParseError;
use stomp_transport::TransportError;

/// Hard failures of a binding operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),
}

impl BindingError {
    pub fn connection_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("connection not found: {id}"))
    }

    pub fn subscription_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("subscription not found: {id}"))
    }

    pub fn frame_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("message frame not found: {id}; call readFrame first"))
    }

    pub fn transaction_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("transaction not found in any connection: {id}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<ParseError> for BindingError {
    fn from(e: ParseError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Convenience alias.
pub type BindingResult<T> = Result<T, BindingError>;

/// Result envelope: `{"status":"success", ...}` or `{"status":"error","message":...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    Error { message: String },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success payload, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error { message } => Some(message),
        }
    }
}

impl<T> From<TransportError> for Outcome<T> {
    fn from(e: TransportError) -> Self {
        Self::Error {
            message: e.to_string(),
        }
    }
}

use reqwest::StatusCode;

use crate::models::FormError;

// ============================================================================
// API Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection, timeout or body-decoding failure inside reqwest.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status without a usable error body.
    #[error("{op} returned {status}")]
    Status { op: &'static str, status: StatusCode },

    /// The backend answered but refused the command.
    #[error("{op} rejected: {message}")]
    Rejected { op: &'static str, message: String },

    /// Circuit breaker is open; the request was never sent.
    #[error("order service unavailable (circuit open)")]
    CircuitOpen,

    /// Local precondition failed; the request was never sent.
    #[error("command not allowed: {0}")]
    Precondition(&'static str),

    #[error(transparent)]
    Form(#[from] FormError),
}

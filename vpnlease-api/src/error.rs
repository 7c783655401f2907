//! Authority client error types.

use thiserror::Error;

/// Result type for authority calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur when talking to the authority.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The authority answered with a non-success status.
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Returns true if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Rejected { .. })
    }

    /// Returns the HTTP status of a rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}


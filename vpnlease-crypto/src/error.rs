//! Error types for key handling.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur when decoding key material.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key is not valid base64.
    #[error("invalid key encoding: {0}")]
    Encoding(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

//! Error types for the config store.

use thiserror::Error;

/// Config store errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The record violates a consistency rule.
    #[error("config invariant violated: {0}")]
    Invariant(String),

    /// The store moved past the revision the caller started from.
    #[error("stale config: expected revision {expected}, store is at {actual}")]
    Stale { expected: u64, actual: u64 },

    /// The persisted record was written by a newer schema.
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    /// Returns true if this error means another writer got there first.
    pub fn is_stale(&self) -> bool {
        matches!(self, ConfigError::Stale { .. })
    }
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

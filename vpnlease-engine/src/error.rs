//! Error types for the reconciliation engine.

use thiserror::Error;
use vpnlease_api::ApiError;
use vpnlease_config::ConfigError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can end a reconciliation attempt or user action.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Too many attempts in the current window.
    #[error("too many reconciliation requests")]
    RateLimited,

    /// A remote call failed after exhausting its retries.
    #[error("authority call failed: {0}")]
    Api(#[from] ApiError),

    /// The config store rejected a write.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An action needs an account that does not exist yet.
    #[error("no account")]
    NoAccount,

    /// The requested gateway is not listed by the authority.
    #[error("gateway not found: {0}")]
    GatewayNotFound(String),

    /// Caller supplied an unusable value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The tunnel collaborator failed.
    #[error("tunnel error: {0}")]
    Tunnel(String),
}

impl EngineError {
    /// Returns true if the attempt was overtaken by a newer config write.
    pub fn is_superseded(&self) -> bool {
        matches!(self, EngineError::Config(e) if e.is_stale())
    }
}

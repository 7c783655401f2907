//! Engine tuning.

use chrono::Duration;

/// Tunables of the reconciliation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retries after the first attempt of each remote call.
    pub max_retries: u32,
    /// Lead time before expiry at which accounts and leases count as expired.
    pub expiration_offset: Duration,
    /// Length of the rate guard window.
    pub rate_window: Duration,
    /// Attempts allowed per rate guard window.
    pub rate_max_requests: u32,
    /// Pause before re-running an overdue check, so the tunnel can go down.
    pub recheck_grace: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: vpnlease_api::MAX_RETRIES,
            expiration_offset: vpnlease_types::expiration_offset(),
            rate_window: Duration::seconds(10),
            rate_max_requests: 10,
            recheck_grace: std::time::Duration::from_secs(3),
        }
    }
}

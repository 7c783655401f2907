//! Derived connection state.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use vpnlease_config::AccountConfig;
use vpnlease_types::expires_within;

/// Where a config stands in the reconciliation state machine.
///
/// Never stored; always derived from the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionStatus {
    NoAccount,
    AccountUnverified,
    AccountExpired,
    NoLease,
    LeaseExpiredOrMissing,
    Connected,
}

impl ConnectionStatus {
    /// Classifies `config` as seen at `now`.
    pub fn of(config: &AccountConfig, now: DateTime<Utc>, offset: Duration) -> Self {
        if config.is_restoring() {
            return ConnectionStatus::AccountUnverified;
        }
        if !config.has_account() {
            return ConnectionStatus::NoAccount;
        }
        if config.active_until == DateTime::<Utc>::default() {
            return ConnectionStatus::AccountUnverified;
        }
        if expires_within(config.active_until, now, offset) {
            return ConnectionStatus::AccountExpired;
        }
        if !config.has_gateway() || !config.has_lease() {
            return ConnectionStatus::NoLease;
        }
        if !config.connected || expires_within(config.lease_active_until, now, offset) {
            return ConnectionStatus::LeaseExpiredOrMissing;
        }
        ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

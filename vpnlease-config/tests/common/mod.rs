//! Shared test helpers for config tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use vpnlease_config::AccountConfig;
use vpnlease_types::{Gateway, LeaseGrant};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn gateway() -> Gateway {
    Gateway {
        public_key: "gw-key".to_string(),
        ipv4: "203.0.113.7".to_string(),
        port: 51820,
        nice_name: "Amsterdam".to_string(),
    }
}

/// An account with identity but no gateway.
pub fn with_account() -> AccountConfig {
    AccountConfig {
        active_until: t0() + Duration::days(30),
        ..AccountConfig::default()
    }
    .with_identity("acct-1", "priv-key", "pub-key")
}

/// A fully connected config.
pub fn connected() -> AccountConfig {
    with_account().with_gateway(&gateway()).with_lease(&LeaseGrant {
        vip4: "10.143.0.2".to_string(),
        vip6: "fdad:b10c:a::2".to_string(),
        expires: t0() + Duration::days(1),
    })
}

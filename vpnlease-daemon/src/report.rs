//! Human- and machine-readable status output.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vpnlease_config::AccountConfig;
use vpnlease_engine::ConnectionStatus;

/// What `vpnlease status` prints. Never includes key material.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: ConnectionStatus,
    pub revision: u64,
    pub has_account: bool,
    pub restoring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_until: Option<DateTime<Utc>>,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub vip4: String,
    pub vip6: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_active_until: Option<DateTime<Utc>>,
    pub connected: bool,
}

impl StatusReport {
    pub fn new(status: ConnectionStatus, revision: u64, config: &AccountConfig) -> Self {
        let set = |t: DateTime<Utc>| (t != DateTime::<Utc>::default()).then_some(t);
        Self {
            status,
            revision,
            has_account: config.has_account(),
            restoring: config.is_restoring(),
            active_until: set(config.active_until),
            public_key: config.public_key.clone(),
            gateway: config.has_gateway().then(|| {
                if config.gateway_nice_name.is_empty() {
                    config.gateway_id.clone()
                } else {
                    config.gateway_nice_name.clone()
                }
            }),
            endpoint: config
                .has_gateway()
                .then(|| format!("{}:{}", config.gateway_ip, config.gateway_port)),
            vip4: config.vip4.clone(),
            vip6: config.vip6.clone(),
            lease_active_until: set(config.lease_active_until),
            connected: config.connected,
        }
    }
}

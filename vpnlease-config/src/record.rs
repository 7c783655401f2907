//! The account and connection record.

use crate::error::{ConfigError, ConfigResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vpnlease_types::{Gateway, LeaseGrant, LeaseRequest};

/// Everything the client knows about its account, identity, gateway and lease.
///
/// Instances are immutable snapshots; callers derive a new record with the
/// `with_*` helpers and hand it to the store as a whole.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountConfig {
    /// Authoritative account identifier (empty before creation).
    pub account_id: String,
    /// Account identifier being restored; promoted once verified.
    pub restored_account_id: String,
    /// When the account's entitlement ends.
    pub active_until: DateTime<Utc>,
    /// Client private key (base64), generated once per account.
    pub private_key: String,
    /// Client public key (base64).
    pub public_key: String,
    /// Selected gateway's public key.
    pub gateway_id: String,
    pub gateway_ip: String,
    pub gateway_port: u16,
    pub gateway_nice_name: String,
    /// Virtual IPv4 address assigned by the current lease.
    pub vip4: String,
    /// Virtual IPv6 address assigned by the current lease.
    pub vip6: String,
    /// When the current lease lapses.
    pub lease_active_until: DateTime<Utc>,
    /// Whether the tunnel should currently be up.
    pub connected: bool,
    /// Last periodic account verification.
    pub last_daily_check: DateTime<Utc>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            restored_account_id: String::new(),
            active_until: DateTime::<Utc>::default(),
            private_key: String::new(),
            public_key: String::new(),
            gateway_id: String::new(),
            gateway_ip: String::new(),
            gateway_port: 0,
            gateway_nice_name: String::new(),
            vip4: String::new(),
            vip6: String::new(),
            lease_active_until: DateTime::<Utc>::default(),
            connected: false,
            last_daily_check: DateTime::<Utc>::default(),
        }
    }
}

impl AccountConfig {
    /// Returns true once an account has been created or restored.
    #[must_use]
    pub fn has_account(&self) -> bool {
        !self.account_id.trim().is_empty()
    }

    /// Returns true if a restore is waiting to be verified.
    #[must_use]
    pub fn is_restoring(&self) -> bool {
        !self.restored_account_id.trim().is_empty()
    }

    /// The account identifier to verify: the restored one if present.
    #[must_use]
    pub fn effective_account_id(&self) -> &str {
        if self.is_restoring() {
            &self.restored_account_id
        } else {
            &self.account_id
        }
    }

    /// Returns true if a complete gateway identity is selected.
    #[must_use]
    pub fn has_gateway(&self) -> bool {
        !self.gateway_id.trim().is_empty()
            && !self.gateway_ip.trim().is_empty()
            && self.gateway_port != 0
    }

    /// Returns true if lease addresses are populated.
    #[must_use]
    pub fn has_lease(&self) -> bool {
        !self.vip4.is_empty() || !self.vip6.is_empty() || self.lease_active_until != DateTime::<Utc>::default()
    }

    /// Account expiry minus the safety margin.
    #[must_use]
    pub fn account_expiration(&self, offset: Duration) -> DateTime<Utc> {
        self.active_until - offset
    }

    /// Lease expiry minus the safety margin.
    #[must_use]
    pub fn lease_expiration(&self, offset: Duration) -> DateTime<Utc> {
        self.lease_active_until - offset
    }

    /// The earlier of the account and lease expirations.
    #[must_use]
    pub fn next_recheck(&self, offset: Duration) -> DateTime<Utc> {
        self.account_expiration(offset).min(self.lease_expiration(offset))
    }

    /// The request identifying the lease for the current key and gateway.
    ///
    /// Returns `None` when there is no account or no gateway to lease.
    #[must_use]
    pub fn lease_request(&self) -> Option<LeaseRequest> {
        if !self.has_account() || self.gateway_id.trim().is_empty() || self.public_key.is_empty() {
            return None;
        }
        Some(LeaseRequest::new(
            self.account_id.clone(),
            self.public_key.clone(),
            self.gateway_id.clone(),
        ))
    }

    /// Derives a record with a new account identity and key pair.
    #[must_use]
    pub fn with_identity(
        &self,
        account_id: impl Into<String>,
        private_key: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            private_key: private_key.into(),
            public_key: public_key.into(),
            ..self.clone()
        }
    }

    /// Derives a record with the verified account expiry merged in.
    ///
    /// A pending restore is promoted to the authoritative identifier.
    #[must_use]
    pub fn with_account_verified(&self, active_until: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.active_until = active_until;
        if self.is_restoring() {
            next.account_id = std::mem::take(&mut next.restored_account_id);
        }
        next
    }

    /// Derives a record pointing at `gateway`.
    #[must_use]
    pub fn with_gateway(&self, gateway: &Gateway) -> Self {
        Self {
            gateway_id: gateway.public_key.clone(),
            gateway_ip: gateway.ipv4.clone(),
            gateway_port: gateway.port,
            gateway_nice_name: gateway.display_name().to_string(),
            ..self.clone()
        }
    }

    /// Derives a connected record holding `grant`.
    #[must_use]
    pub fn with_lease(&self, grant: &LeaseGrant) -> Self {
        Self {
            vip4: grant.vip4.clone(),
            vip6: grant.vip6.clone(),
            lease_active_until: grant.expires,
            connected: true,
            ..self.clone()
        }
    }

    /// Derives a record that is marked inactive but keeps its lease fields.
    #[must_use]
    pub fn with_connected(&self, connected: bool) -> Self {
        Self {
            connected,
            ..self.clone()
        }
    }

    /// Derives a record with connection, gateway and lease fields zeroed.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self {
            connected: false,
            gateway_id: String::new(),
            gateway_ip: String::new(),
            gateway_port: 0,
            gateway_nice_name: String::new(),
            vip4: String::new(),
            vip6: String::new(),
            lease_active_until: DateTime::<Utc>::default(),
            ..self.clone()
        }
    }

    /// Checks the record's consistency rules.
    pub fn validate(&self) -> ConfigResult<()> {
        let id_set = !self.gateway_id.trim().is_empty();
        let ip_set = !self.gateway_ip.trim().is_empty();
        let port_set = self.gateway_port != 0;
        if !(id_set == ip_set && ip_set == port_set) {
            return Err(ConfigError::Invariant(
                "gateway id, address and port must be set or cleared together".to_string(),
            ));
        }
        if !id_set && !self.gateway_nice_name.is_empty() {
            return Err(ConfigError::Invariant(
                "gateway name set without a gateway".to_string(),
            ));
        }

        if self.private_key.is_empty() != self.public_key.is_empty() {
            return Err(ConfigError::Invariant(
                "private and public key must be set together".to_string(),
            ));
        }

        if !self.has_account() && (id_set || self.has_lease() || self.connected) {
            return Err(ConfigError::Invariant(
                "gateway or lease present without an account".to_string(),
            ));
        }

        if self.connected {
            if !self.has_gateway() {
                return Err(ConfigError::Invariant("connected without a gateway".to_string()));
            }
            if self.public_key.is_empty() {
                return Err(ConfigError::Invariant("connected without a key pair".to_string()));
            }
            if self.vip4.is_empty() || self.vip6.is_empty() {
                return Err(ConfigError::Invariant(
                    "connected without assigned addresses".to_string(),
                ));
            }
            if self.lease_active_until == DateTime::<Utc>::default() {
                return Err(ConfigError::Invariant("connected without a lease expiry".to_string()));
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("has_account", &self.has_account())
            .field("restoring", &self.is_restoring())
            .field("active_until", &self.active_until)
            .field("public_key", &self.public_key)
            .field("gateway_id", &self.gateway_id)
            .field("gateway_ip", &self.gateway_ip)
            .field("gateway_port", &self.gateway_port)
            .field("vip4", &self.vip4)
            .field("vip6", &self.vip6)
            .field("lease_active_until", &self.lease_active_until)
            .field("connected", &self.connected)
            .finish()
    }
}

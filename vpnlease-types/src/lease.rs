//! Leases: time-bounded bindings of a client key to a gateway.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A lease as listed by `GET /lease`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    /// Client public key the lease is bound to.
    pub public_key: String,
    /// Gateway (public key) the lease is bound to.
    pub gateway_id: String,
    /// Assigned virtual IPv4 address.
    pub vip4: String,
    /// Assigned virtual IPv6 address.
    pub vip6: String,
    /// When the lease lapses.
    pub expires: DateTime<Utc>,
}

impl Lease {
    /// Returns true if the lease expires within `offset` of `now`.
    #[must_use]
    pub fn expires_soon(&self, now: DateTime<Utc>, offset: Duration) -> bool {
        crate::expires_within(self.expires, now, offset)
    }

    /// Returns true if this lease binds `public_key` to `gateway_id`.
    #[must_use]
    pub fn matches(&self, public_key: &str, gateway_id: &str) -> bool {
        self.public_key == public_key && self.gateway_id == gateway_id
    }

    /// Returns the virtual addresses and expiry of this lease.
    #[must_use]
    pub fn grant(&self) -> LeaseGrant {
        LeaseGrant {
            vip4: self.vip4.clone(),
            vip6: self.vip6.clone(),
            expires: self.expires,
        }
    }
}

/// Addresses and expiry assigned by `POST /lease`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseGrant {
    /// Assigned virtual IPv4 address.
    pub vip4: String,
    /// Assigned virtual IPv6 address.
    pub vip6: String,
    /// When the lease lapses.
    pub expires: DateTime<Utc>,
}

/// Body of `POST /lease` and `DELETE /lease`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRequest {
    pub account_id: String,
    pub public_key: String,
    pub gateway_id: String,
}

impl LeaseRequest {
    /// Creates a lease request.
    pub fn new(
        account_id: impl Into<String>,
        public_key: impl Into<String>,
        gateway_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            public_key: public_key.into(),
            gateway_id: gateway_id.into(),
        }
    }
}

//! Account record as returned by the authority.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The billing identity authorizing VPN usage.
///
/// `POST /account` only returns the identifier; `active_until` then
/// deserializes to the Unix epoch, i.e. an account that is not yet active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account identifier.
    pub account_id: String,
    /// When the account's entitlement ends.
    #[serde(default)]
    pub active_until: DateTime<Utc>,
}

impl Account {
    /// Creates an account record.
    pub fn new(account_id: impl Into<String>, active_until: DateTime<Utc>) -> Self {
        Self {
            account_id: account_id.into(),
            active_until,
        }
    }

    /// Returns true if the account expires within `offset` of `now`.
    #[must_use]
    pub fn expires_soon(&self, now: DateTime<Utc>, offset: Duration) -> bool {
        crate::expires_within(self.active_until, now, offset)
    }
}

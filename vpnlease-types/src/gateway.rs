//! VPN server endpoints.

use serde::{Deserialize, Serialize};

/// A remote VPN server endpoint, identified by its public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    /// The gateway's public key (also its identifier).
    pub public_key: String,
    /// IPv4 address the tunnel connects to.
    pub ipv4: String,
    /// UDP port of the tunnel endpoint.
    pub port: u16,
    /// Human-readable location name.
    #[serde(default)]
    pub nice_name: String,
}

impl Gateway {
    /// Returns the display name, falling back to the address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.nice_name.trim().is_empty() {
            &self.ipv4
        } else {
            &self.nice_name
        }
    }

    /// Returns `ip:port` for the tunnel peer.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ipv4, self.port)
    }
}

//! Core type definitions for the VPN lease client.
//!
//! This crate defines the types shared by every layer of the client:
//! - Account, gateway and lease records as exchanged with the authority
//! - The lease request body used to acquire and release leases
//! - A `Clock` abstraction so expiry decisions can be tested deterministically
//!
//! All timestamps are UTC. Expiry checks apply a safety margin
//! ([`EXPIRATION_OFFSET_SECS`]) so that a resource about to lapse is treated
//! as already expired.

mod account;
mod clock;
mod gateway;
mod lease;

pub use account::Account;
pub use clock::{Clock, ManualClock, SystemClock};
pub use gateway::Gateway;
pub use lease::{Lease, LeaseGrant, LeaseRequest};

use chrono::{DateTime, Duration, Utc};

/// Lead time before actual expiry at which a resource counts as expired.
pub const EXPIRATION_OFFSET_SECS: i64 = 60;

/// Returns the default safety margin as a duration.
#[must_use]
pub fn expiration_offset() -> Duration {
    Duration::seconds(EXPIRATION_OFFSET_SECS)
}

/// Returns true if `expiry` falls within `offset` of `now` (or has passed).
#[must_use]
pub fn expires_within(expiry: DateTime<Utc>, now: DateTime<Utc>, offset: Duration) -> bool {
    expiry - offset <= now
}

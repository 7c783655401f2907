//! Account and lease reconciliation for the VPN lease client.
//!
//! The engine keeps the locally persisted [`AccountConfig`] in step with the
//! remote authority. Every external trigger (app start, timer, user action,
//! periodic liveness poll) starts one reconciliation attempt.
//!
//! # Reconciliation
//!
//! 1. **Rate guard**: at most 10 attempts per 10-second window; a denied
//!    attempt clears the connection without any remote call.
//! 2. **Account**: create one if none exists (and stop), otherwise verify the
//!    account (promoting a pending restore). An account expiring within the
//!    safety margin clears the connection.
//! 3. **Gateway**: the selected gateway must still be listed by the authority.
//! 4. **Lease**: obsolete leases (other public keys) are released in the
//!    background; a matching unexpired lease is adopted, otherwise a new one
//!    is requested. A lease the record rejects is a terminal failure.
//! 5. **Schedule**: a one-shot recheck is armed just before the account or
//!    lease lapses, whichever is sooner.
//!
//! Every remote call goes through [`vpnlease_api::call_with_retry`]. Terminal
//! failures clear the connection; user-initiated attempts additionally report
//! to the [`PresentationSink`].
//!
//! All writes use the config store's optimistic revision check, so an attempt
//! overtaken by a newer write is abandoned rather than overwriting it.
//!
//! [`AccountConfig`]: vpnlease_config::AccountConfig

mod config;
mod engine;
mod error;
mod notify;
mod rate_guard;
mod scheduler;
mod status;
mod trigger;
mod tunnel;

pub use config::EngineConfig;
pub use engine::{ClearReason, Engine, Outcome};
pub use error::{EngineError, EngineResult};
pub use notify::{NotificationKind, PresentationSink, RecordingSink, TracingSink};
pub use rate_guard::RateGuard;
pub use scheduler::{ManualTimer, Timer, TokioTimer};
pub use status::ConnectionStatus;
pub use trigger::Trigger;
pub use tunnel::{Tunnel, TunnelParams, TunnelSupervisor};

//! Service wiring for the VPN lease client.
//!
//! The binary is a thin shell around [`Service`]: it parses [`Args`],
//! installs logging and either runs the trigger loop or executes a single
//! [`Command`].

mod cli;
mod report;
mod service;
mod tunnel;

pub use cli::{Args, Command};
pub use report::StatusReport;
pub use service::{execute, Service};
pub use tunnel::LoggingTunnel;

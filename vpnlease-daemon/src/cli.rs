//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vpnlease")]
#[command(about = "Keeps a VPN account and gateway lease current")]
pub struct Args {
    /// Base URL of the lease authority
    #[arg(long, env = "VPNLEASE_API_URL", default_value = "http://127.0.0.1:8080/v1")]
    pub api_url: String,

    /// Directory holding the persisted account record
    #[arg(long, env = "VPNLEASE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Seconds between liveness checks while running
    #[arg(long, default_value = "300")]
    pub liveness_interval_secs: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run in the foreground, reconciling on every trigger (default)
    Run,
    /// Print the stored account and connection state
    Status,
    /// List gateways offered by the authority
    Gateways,
    /// Select a gateway by public key and connect
    SelectGateway { public_key: String },
    /// Restore an existing account on this device
    Restore { account_id: String },
    /// Disconnect and release the current lease
    Disconnect,
    /// Run one reconciliation now
    Check,
}

impl Args {
    /// The subcommand to run, `run` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

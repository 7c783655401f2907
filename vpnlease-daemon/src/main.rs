//! VPN lease client.
//!
//! Keeps the account verified and a gateway lease current, renewing shortly
//! before either lapses.
//!
//! Usage:
//!   vpnlease --api-url https://api.example.net/v1 run
//!   vpnlease select-gateway <public-key>
//!   vpnlease status

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vpnlease_daemon::{execute, Args, Command, LoggingTunnel, Service};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let service = Service::open(&args)?;

    match args.command() {
        Command::Run => {
            info!("VPN lease client starting against {}", args.api_url);
            service
                .run(LoggingTunnel::new(), async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for shutdown signal: {e}");
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
        }
        command => {
            let output = execute(&service, &command).await?;
            println!("{output}");
        }
    }

    Ok(())
}

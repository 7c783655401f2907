//! Tunnel adapter that only logs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use vpnlease_engine::{EngineResult, Tunnel, TunnelParams};

/// Stands in for a real tunnel device: logs what would be configured.
#[derive(Debug, Default)]
pub struct LoggingTunnel {
    up: AtomicBool,
}

impl LoggingTunnel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tunnel for LoggingTunnel {
    async fn connect(&self, params: &TunnelParams) -> EngineResult<()> {
        info!(
            "Tunnel up: peer {} at {}, addresses {} / {}",
            params.peer_public_key, params.peer_endpoint, params.vip4, params.vip6
        );
        self.up.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> EngineResult<()> {
        info!("Tunnel down");
        self.up.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}

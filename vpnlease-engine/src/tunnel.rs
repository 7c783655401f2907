//! Drives the external tunnel from config snapshots.

use crate::error::EngineResult;
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vpnlease_config::{AccountConfig, Snapshot};

/// Everything the tunnel needs to come up.
#[derive(Clone, PartialEq, Eq)]
pub struct TunnelParams {
    /// Client private key (base64).
    pub private_key: String,
    /// Gateway public key (base64).
    pub peer_public_key: String,
    /// `ip:port` of the gateway.
    pub peer_endpoint: String,
    pub vip4: String,
    pub vip6: String,
}

impl TunnelParams {
    /// Extracts tunnel parameters from a connected config.
    ///
    /// Returns `None` unless the config wants the tunnel up.
    pub fn from_config(config: &AccountConfig) -> Option<Self> {
        if !config.connected || !config.has_gateway() || config.private_key.is_empty() {
            return None;
        }
        Some(Self {
            private_key: config.private_key.clone(),
            peer_public_key: config.gateway_id.clone(),
            peer_endpoint: format!("{}:{}", config.gateway_ip, config.gateway_port),
            vip4: config.vip4.clone(),
            vip6: config.vip6.clone(),
        })
    }
}

impl std::fmt::Debug for TunnelParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelParams")
            .field("private_key", &"[REDACTED]")
            .field("peer_public_key", &self.peer_public_key)
            .field("peer_endpoint", &self.peer_endpoint)
            .field("vip4", &self.vip4)
            .field("vip6", &self.vip6)
            .finish()
    }
}

/// The encrypted tunnel, treated as a black box.
#[async_trait]
pub trait Tunnel: Send + Sync {
    /// Brings the tunnel up with `params`.
    async fn connect(&self, params: &TunnelParams) -> EngineResult<()>;

    /// Tears the tunnel down.
    async fn disconnect(&self) -> EngineResult<()>;

    /// Reports whether the tunnel is currently up.
    fn is_connected(&self) -> bool;
}

/// Keeps the tunnel in line with the stored config.
pub struct TunnelSupervisor<T: Tunnel> {
    tunnel: T,
    active: Option<TunnelParams>,
}

impl<T: Tunnel> TunnelSupervisor<T> {
    pub fn new(tunnel: T) -> Self {
        Self {
            tunnel,
            active: None,
        }
    }

    /// Returns the wrapped tunnel.
    pub fn tunnel(&self) -> &T {
        &self.tunnel
    }

    /// Parameters the tunnel is currently up with, if any.
    pub fn active(&self) -> Option<&TunnelParams> {
        self.active.as_ref()
    }

    /// Connects, reconnects or disconnects so the tunnel matches `config`.
    pub async fn apply(&mut self, config: &AccountConfig) -> EngineResult<()> {
        let desired = TunnelParams::from_config(config);
        if desired == self.active {
            return Ok(());
        }

        if self.active.take().is_some() {
            info!("Stopping tunnel");
            self.tunnel.disconnect().await?;
        }

        if let Some(params) = desired {
            info!("Starting tunnel to {}", params.peer_endpoint);
            self.tunnel.connect(&params).await?;
            self.active = Some(params);
        }
        Ok(())
    }

    /// Follows config snapshots until `shutdown` resolves or the store goes
    /// away, then brings the tunnel down.
    pub async fn run<F>(mut self, mut snapshots: watch::Receiver<Snapshot>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let config = snapshots.borrow_and_update().config.clone();
            if let Err(e) = self.apply(&config).await {
                warn!("Tunnel update failed: {e}");
            }

            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        debug!("Config store closed, stopping tunnel supervisor");
                        break;
                    }
                }
                _ = &mut shutdown => {
                    debug!("Tunnel supervisor shutting down");
                    break;
                }
            }
        }

        if self.active.take().is_some() {
            if let Err(e) = self.tunnel.disconnect().await {
                warn!("Tunnel shutdown failed: {e}");
            }
        }
    }
}

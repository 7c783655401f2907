//! Trigger loop and one-shot commands.

use crate::cli::{Args, Command};
use crate::report::StatusReport;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use vpnlease_api::{call_with_retry, Authority, HttpAuthority, HttpAuthorityConfig, Operation};
use vpnlease_config::{ConfigStore, FilePersistence};
use vpnlease_engine::{
    Engine, EngineConfig, EngineResult, Outcome, TokioTimer, TracingSink, Trigger, Tunnel,
    TunnelSupervisor,
};
use vpnlease_types::{Clock, SystemClock};

/// An engine together with the channel its triggers arrive on.
pub struct Service {
    engine: Arc<Engine>,
    authority: Arc<dyn Authority>,
    trigger_tx: mpsc::Sender<Trigger>,
    trigger_rx: mpsc::Receiver<Trigger>,
    liveness_interval: Duration,
}

impl Service {
    /// Opens the persisted record and connects to the configured authority.
    pub fn open(args: &Args) -> Result<Self> {
        let dir = match &args.state_dir {
            Some(dir) => dir.clone(),
            None => FilePersistence::default_dir().context("No state directory available")?,
        };
        info!("State directory: {}", dir.display());

        let store = ConfigStore::open(Arc::new(FilePersistence::new(dir)))
            .context("Failed to load account record")?;
        let authority = HttpAuthority::new(HttpAuthorityConfig {
            base_url: args.api_url.clone(),
            ..Default::default()
        })
        .context("Failed to create authority client")?;

        let (trigger_tx, trigger_rx) = mpsc::channel(16);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let timer = Arc::new(TokioTimer::new(Arc::clone(&clock), trigger_tx.clone()));
        let authority: Arc<dyn Authority> = Arc::new(authority);

        let engine = Engine::with_clock(
            EngineConfig::default(),
            Arc::new(store),
            Arc::clone(&authority),
            timer,
            Arc::new(TracingSink),
            clock,
        );

        Ok(Self {
            engine: Arc::new(engine),
            authority,
            trigger_tx,
            trigger_rx,
            liveness_interval: Duration::from_secs(args.liveness_interval_secs.max(1)),
        })
    }

    /// Assembles a service from an existing engine.
    ///
    /// `trigger_tx` must be the sender the engine's timer posts into.
    pub fn from_parts(
        engine: Arc<Engine>,
        authority: Arc<dyn Authority>,
        trigger_tx: mpsc::Sender<Trigger>,
        trigger_rx: mpsc::Receiver<Trigger>,
        liveness_interval: Duration,
    ) -> Self {
        Self {
            engine,
            authority,
            trigger_tx,
            trigger_rx,
            liveness_interval,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Sender for injecting triggers into a running loop.
    pub fn triggers(&self) -> mpsc::Sender<Trigger> {
        self.trigger_tx.clone()
    }

    /// Runs reconciliations until `shutdown` resolves.
    ///
    /// Triggers are handled one at a time, in arrival order. The tunnel
    /// follows the stored config and is brought down on exit.
    pub async fn run<T, F>(mut self, tunnel: T, shutdown: F) -> Result<()>
    where
        T: Tunnel + 'static,
        F: Future<Output = ()>,
    {
        let (stop_tunnel, tunnel_stopped) = oneshot::channel::<()>();
        let supervisor = tokio::spawn(TunnelSupervisor::new(tunnel).run(
            self.engine.store().subscribe(),
            async move {
                let _ = tunnel_stopped.await;
            },
        ));

        self.trigger_tx
            .send(Trigger::AppStart)
            .await
            .context("Trigger channel closed")?;

        let mut liveness = tokio::time::interval(self.liveness_interval);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Skip);
        liveness.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
                Some(trigger) = self.trigger_rx.recv() => {
                    let result = self.engine.check_account_info(trigger).await;
                    log_outcome(trigger, result);
                }
                _ = liveness.tick() => {
                    match self.engine.periodic_check().await {
                        Ok(Some(outcome)) => log_outcome(Trigger::Liveness, Ok(outcome)),
                        Ok(None) => debug!("Liveness check: nothing due"),
                        Err(e) => warn!("Liveness check failed: {e}"),
                    }
                }
            }
        }

        self.engine.drain_background().await;
        let _ = stop_tunnel.send(());
        if let Err(e) = supervisor.await {
            warn!("Tunnel supervisor failed: {e}");
        }
        Ok(())
    }
}

fn log_outcome(trigger: Trigger, result: EngineResult<Outcome>) {
    match result {
        Ok(Outcome::Connected { next_recheck }) => {
            info!("Reconciled ({trigger}): connected, next check at {next_recheck}")
        }
        Ok(outcome) => info!("Reconciled ({trigger}): {outcome:?}"),
        Err(e) => error!("Reconciliation ({trigger}) failed: {e}"),
    }
}

/// Executes a one-shot command and returns the text to print.
pub async fn execute(service: &Service, command: &Command) -> Result<String> {
    let engine = service.engine();
    let output = match command {
        Command::Run => anyhow::bail!("`run` is handled by the trigger loop"),
        Command::Status => {
            let snapshot = engine.snapshot();
            let report = StatusReport::new(engine.status(), snapshot.revision, &snapshot.config);
            serde_json::to_string_pretty(&report)?
        }
        Command::Gateways => {
            let gateways = call_with_retry(
                Operation::Gateways,
                engine.settings().max_retries,
                || service.authority.gateways(),
            )
            .await
            .context("Failed to list gateways")?;
            let selected = engine.snapshot().config.gateway_id;
            gateways
                .iter()
                .map(|g| {
                    let marker = if g.public_key == selected { "*" } else { " " };
                    format!("{marker} {}  {}  {}", g.public_key, g.endpoint(), g.display_name())
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::SelectGateway { public_key } => {
            let outcome = engine
                .select_gateway(public_key)
                .await
                .context("Failed to select gateway")?;
            format!("{outcome:?}")
        }
        Command::Restore { account_id } => {
            let outcome = engine
                .restore_account(account_id)
                .await
                .context("Failed to restore account")?;
            format!("{outcome:?}")
        }
        Command::Disconnect => {
            engine.disconnect().await.context("Failed to disconnect")?;
            "Disconnected".to_string()
        }
        Command::Check => {
            let outcome = engine
                .check_account_info(Trigger::User)
                .await
                .context("Check failed")?;
            format!("{outcome:?}")
        }
    };

    engine.drain_background().await;
    Ok(output)
}

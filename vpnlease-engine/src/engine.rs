//! The reconciliation engine: account, gateway and lease state machine.
//!
//! The engine performs no I/O of its own. Remote calls go through the
//! [`Authority`], state lives in the [`ConfigStore`], wake-ups go to the
//! [`Timer`] and user-visible outcomes to the [`PresentationSink`].

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::notify::{NotificationKind, PresentationSink};
use crate::rate_guard::RateGuard;
use crate::scheduler::Timer;
use crate::status::ConnectionStatus;
use crate::trigger::Trigger;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vpnlease_api::{call_with_retry, ApiResult, Authority, Operation};
use vpnlease_config::{AccountConfig, ConfigStore, Snapshot};
use vpnlease_crypto::KeyPair;
use vpnlease_types::{Clock, Lease, LeaseRequest, SystemClock};

/// Why an attempt ended with the connection cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// The account expires within the safety margin.
    AccountExpired,
    /// No gateway has been selected.
    NoGateway,
    /// The selected gateway is no longer listed.
    GatewayUnavailable,
    /// The record has no key pair to lease with.
    MissingKeys,
}

/// How a reconciliation attempt ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new account was created; the lease check waits for the next trigger.
    AccountCreated,
    /// The desired connection is unreachable right now.
    Cleared(ClearReason),
    /// A lease is held and a recheck is armed.
    Connected { next_recheck: DateTime<Utc> },
    /// A newer config write overtook this attempt.
    Superseded,
}

/// Where a terminal failure happened, for the user-facing message.
#[derive(Debug, Clone, Copy)]
enum Stage {
    CreateAccount,
    AccountInfo,
    Gateways,
    Leases,
    NewLease,
}

impl Stage {
    fn message(self) -> &'static str {
        match self {
            Stage::CreateAccount => "cannot create account",
            _ => "cannot connect",
        }
    }
}

enum Step {
    Done(Outcome),
    /// The recheck time had already passed; run the full check again.
    Overdue,
}

/// Reconciles the stored config with the authority.
pub struct Engine {
    settings: EngineConfig,
    store: Arc<ConfigStore>,
    authority: Arc<dyn Authority>,
    timer: Arc<dyn Timer>,
    sink: Arc<dyn PresentationSink>,
    clock: Arc<dyn Clock>,
    guard: Mutex<RateGuard>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Creates an engine with default settings and the system clock.
    pub fn new(
        store: Arc<ConfigStore>,
        authority: Arc<dyn Authority>,
        timer: Arc<dyn Timer>,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        Self::with_clock(
            EngineConfig::default(),
            store,
            authority,
            timer,
            sink,
            Arc::new(SystemClock),
        )
    }

    /// Creates an engine with explicit settings and clock.
    pub fn with_clock(
        settings: EngineConfig,
        store: Arc<ConfigStore>,
        authority: Arc<dyn Authority>,
        timer: Arc<dyn Timer>,
        sink: Arc<dyn PresentationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = RateGuard::new(
            Arc::clone(&clock),
            settings.rate_window,
            settings.rate_max_requests,
        );
        Self {
            settings,
            store,
            authority,
            timer,
            sink,
            clock,
            guard: Mutex::new(guard),
            background: Mutex::new(Vec::new()),
        }
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    /// Returns the config store the engine writes to.
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Returns the current config snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.store.get()
    }

    /// Derives the current state from the stored config.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::of(
            &self.store.get().config,
            self.clock.now(),
            self.settings.expiration_offset,
        )
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Runs one full reconciliation attempt against the latest config.
    ///
    /// Terminal failures clear the connection before being returned. An
    /// overdue recheck re-runs the attempt after the grace period.
    pub async fn check_account_info(&self, trigger: Trigger) -> EngineResult<Outcome> {
        self.run(trigger, false).await
    }

    /// Runs the lease stage if the recorded lease has already lapsed.
    ///
    /// Covers wake-ups missed while the device was off. Returns `None` when
    /// nothing was due.
    pub async fn check_lease_if_needed(&self) -> EngineResult<Option<Outcome>> {
        let config = self.store.get().config;
        if !config.has_gateway() || config.lease_active_until >= self.clock.now() {
            return Ok(None);
        }

        info!("Lease lapsed at {}, checking now", config.lease_active_until);
        if config.connected {
            self.sink
                .notify(NotificationKind::LeaseExpired, "lease expired, renewing");
        }
        self.run(Trigger::Liveness, true).await.map(Some)
    }

    /// Handles the recurring liveness poll.
    ///
    /// The first poll of each UTC day runs a full account check; later polls
    /// only renew a lapsed lease.
    pub async fn periodic_check(&self) -> EngineResult<Option<Outcome>> {
        let now = self.clock.now();
        let last = self.store.get().config.last_daily_check;
        if last.date_naive() != now.date_naive() {
            info!("Daily account check");
            self.store
                .update(|c| AccountConfig {
                    last_daily_check: now,
                    ..c.clone()
                })
                .await?;
            return self.check_account_info(Trigger::Daily).await.map(Some);
        }
        self.check_lease_if_needed().await
    }

    async fn run(&self, trigger: Trigger, mut lease_only: bool) -> EngineResult<Outcome> {
        loop {
            let step = match self.attempt(trigger, lease_only).await {
                Ok(step) => step,
                Err(e) if e.is_superseded() => {
                    info!("Reconciliation ({trigger}) superseded by a newer config");
                    return Ok(Outcome::Superseded);
                }
                Err(e) => return Err(e),
            };

            match step {
                Step::Done(outcome) => return Ok(outcome),
                Step::Overdue => {
                    tokio::time::sleep(self.settings.recheck_grace).await;
                    lease_only = false;
                }
            }
        }
    }

    async fn attempt(&self, trigger: Trigger, lease_only: bool) -> EngineResult<Step> {
        let Snapshot {
            mut revision,
            mut config,
        } = self.store.get();
        debug!("Reconciliation ({trigger}) at revision {revision}");

        if !self.allow_request() {
            error!("Too many check account requests recently, disconnecting");
            // No remote call at all here; the lease is left to lapse.
            self.write(&mut revision, config.cleared()).await?;
            if trigger.is_user_initiated() {
                self.sink
                    .notify(NotificationKind::Error, "cannot connect: too many requests");
            }
            return Err(EngineError::RateLimited);
        }

        if !lease_only {
            // A pending restore is verified on the next trigger.
            if !config.has_account() {
                info!("No account yet, creating one");
                return self.create_account(&mut revision, &config, trigger).await;
            }

            let account_id = config.effective_account_id().to_string();
            let account = match self
                .call(Operation::AccountInfo, || {
                    self.authority.account_info(&account_id)
                })
                .await
            {
                Ok(account) => account,
                Err(e) => {
                    return self
                        .fail(&mut revision, &config, trigger, Stage::AccountInfo, e.into())
                        .await;
                }
            };

            let verified = config.with_account_verified(account.active_until);
            if config.is_restoring() {
                info!("Restored account verified");
            }

            let now = self.clock.now();
            if account.expires_soon(now, self.settings.expiration_offset) {
                info!("Account inactive since {}", account.active_until);
                if config.connected {
                    self.sink
                        .notify(NotificationKind::AccountExpired, "account is inactive");
                }
                self.clear(&mut revision, &verified).await?;
                return Ok(Step::Done(Outcome::Cleared(ClearReason::AccountExpired)));
            }
            info!("Account active until {}", account.active_until);

            if verified.gateway_id.trim().is_empty() {
                debug!("No gateway selected");
                self.clear(&mut revision, &verified).await?;
                return Ok(Step::Done(Outcome::Cleared(ClearReason::NoGateway)));
            }

            let gateways = match self
                .call(Operation::Gateways, || self.authority.gateways())
                .await
            {
                Ok(gateways) => gateways,
                Err(e) => {
                    return self
                        .fail(&mut revision, &verified, trigger, Stage::Gateways, e.into())
                        .await;
                }
            };

            let Some(gateway) = gateways
                .iter()
                .find(|g| g.public_key == verified.gateway_id)
            else {
                info!("Selected gateway {} is no longer listed", verified.gateway_id);
                self.clear(&mut revision, &verified).await?;
                return Ok(Step::Done(Outcome::Cleared(ClearReason::GatewayUnavailable)));
            };
            debug!("Found gateway {}", gateway.display_name());
            config = verified.with_gateway(gateway);
        }

        self.check_lease(&mut revision, &config, trigger).await
    }

    async fn create_account(
        &self,
        revision: &mut u64,
        config: &AccountConfig,
        trigger: Trigger,
    ) -> EngineResult<Step> {
        let account = match self
            .call(Operation::CreateAccount, || self.authority.create_account())
            .await
        {
            Ok(account) => account,
            Err(e) => {
                return self
                    .fail(revision, config, trigger, Stage::CreateAccount, e.into())
                    .await;
            }
        };

        let keys = KeyPair::generate();
        let next = config.with_identity(
            account.account_id,
            keys.private_key_base64(),
            keys.public_key_base64(),
        );
        self.write(revision, next).await?;
        info!("New account created, public key {}", keys.public_key_base64());
        Ok(Step::Done(Outcome::AccountCreated))
    }

    async fn check_lease(
        &self,
        revision: &mut u64,
        config: &AccountConfig,
        trigger: Trigger,
    ) -> EngineResult<Step> {
        let Some(request) = config.lease_request() else {
            warn!("No key pair to lease with");
            self.clear(revision, config).await?;
            return Ok(Step::Done(Outcome::Cleared(ClearReason::MissingKeys)));
        };

        let leases = match self
            .call(Operation::Leases, || self.authority.leases(&request.account_id))
            .await
        {
            Ok(leases) => leases,
            Err(e) => {
                return self
                    .fail(revision, config, trigger, Stage::Leases, e.into())
                    .await;
            }
        };

        // Leases for other keys are left over from a restore on another device.
        let (obsolete, current): (Vec<Lease>, Vec<Lease>) = leases
            .into_iter()
            .partition(|l| l.public_key != request.public_key);
        for lease in &obsolete {
            self.spawn_delete(LeaseRequest::new(
                request.account_id.clone(),
                lease.public_key.clone(),
                lease.gateway_id.clone(),
            ));
        }
        if !obsolete.is_empty() {
            self.sink.notify(
                NotificationKind::LeaseDeleted,
                &format!("released {} lease(s) from another device", obsolete.len()),
            );
        }

        let now = self.clock.now();
        let offset = self.settings.expiration_offset;
        let candidate = current
            .iter()
            .find(|l| l.matches(&request.public_key, &request.gateway_id));

        let grant = match candidate {
            Some(lease) if !lease.expires_soon(now, offset) => {
                info!("Found active lease until {}", lease.expires);
                lease.grant()
            }
            _ => {
                debug!("No active lease, or it expires soon");
                match self
                    .call(Operation::RequestLease, || {
                        self.authority.request_lease(&request)
                    })
                    .await
                {
                    Ok(grant) => {
                        info!("New active lease until {}", grant.expires);
                        grant
                    }
                    Err(e) => {
                        return self
                            .fail(revision, config, trigger, Stage::NewLease, e.into())
                            .await;
                    }
                }
            }
        };

        let snapshot = match self.write(revision, config.with_lease(&grant)).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_superseded() => return Err(e),
            // The authority handed out a lease the record cannot hold.
            Err(e) => return self.fail(revision, config, trigger, Stage::NewLease, e).await,
        };
        self.schedule_recheck(revision, &snapshot.config).await
    }

    async fn schedule_recheck(
        &self,
        revision: &mut u64,
        config: &AccountConfig,
    ) -> EngineResult<Step> {
        let at = config.next_recheck(self.settings.expiration_offset);
        if at <= self.clock.now() {
            warn!("Recheck time {at} already passed, marking connection inactive");
            if config.connected {
                self.sink
                    .notify(NotificationKind::LeaseExpired, "lease expired, renewing");
            }
            self.write(revision, config.with_connected(false)).await?;
            return Ok(Step::Overdue);
        }

        self.timer.schedule_one_shot(at);
        info!("Scheduled account / lease recheck for {at}");
        Ok(Step::Done(Outcome::Connected { next_recheck: at }))
    }

    async fn fail(
        &self,
        revision: &mut u64,
        config: &AccountConfig,
        trigger: Trigger,
        stage: Stage,
        cause: EngineError,
    ) -> EngineResult<Step> {
        error!("Reconciliation ({trigger}) failed at {stage:?}: {cause}");
        self.clear(revision, config).await?;
        if trigger.is_user_initiated() {
            self.sink.notify(NotificationKind::Error, stage.message());
        }
        Err(cause)
    }

    // ── User actions ─────────────────────────────────────────────

    /// Selects a gateway by public key and connects to it.
    pub async fn select_gateway(&self, public_key: &str) -> EngineResult<Outcome> {
        if !self.store.get().config.has_account() {
            return Err(EngineError::NoAccount);
        }

        let gateways = match self
            .call(Operation::Gateways, || self.authority.gateways())
            .await
        {
            Ok(gateways) => gateways,
            Err(e) => {
                self.sink
                    .notify(NotificationKind::Error, Stage::Gateways.message());
                return Err(e.into());
            }
        };
        let gateway = gateways
            .into_iter()
            .find(|g| g.public_key == public_key)
            .ok_or_else(|| EngineError::GatewayNotFound(public_key.to_string()))?;

        let Snapshot {
            mut revision,
            config,
        } = self.store.get();
        let next = if config.gateway_id == gateway.public_key {
            config.with_gateway(&gateway)
        } else {
            if let Some(previous) = config.lease_request() {
                self.spawn_delete(previous);
            }
            config.cleared().with_gateway(&gateway)
        };
        self.write(&mut revision, next).await?;
        info!("Selected gateway {}", gateway.display_name());

        self.check_account_info(Trigger::User).await
    }

    /// Starts restoring an existing account on this device.
    ///
    /// The current connection is released; the restored identifier becomes
    /// authoritative once the authority confirms it.
    pub async fn restore_account(&self, account_id: &str) -> EngineResult<Outcome> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(EngineError::InvalidArgument(
                "account id must not be empty".to_string(),
            ));
        }

        let Snapshot {
            mut revision,
            config,
        } = self.store.get();
        self.clear(&mut revision, &config).await?;

        let mut next = config.cleared();
        next.restored_account_id = account_id.to_string();
        if next.public_key.is_empty() {
            let keys = KeyPair::generate();
            next.private_key = keys.private_key_base64();
            next.public_key = keys.public_key_base64();
        }
        self.write(&mut revision, next).await?;
        info!("Restoring account");

        self.check_account_info(Trigger::User).await
    }

    /// Disconnects and releases the current lease.
    pub async fn disconnect(&self) -> EngineResult<()> {
        let Snapshot {
            mut revision,
            config,
        } = self.store.get();
        self.clear(&mut revision, &config).await
    }

    /// Waits for background lease deletions spawned so far.
    pub async fn drain_background(&self) {
        let handles = std::mem::take(
            &mut *self.background.lock().unwrap_or_else(|e| e.into_inner()),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Background lease task failed: {e}");
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn allow_request(&self) -> bool {
        self.guard.lock().unwrap_or_else(|e| e.into_inner()).allow()
    }

    async fn call<T, F, Fut>(&self, operation: Operation, call: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        call_with_retry(operation, self.settings.max_retries, call).await
    }

    async fn write(&self, revision: &mut u64, config: AccountConfig) -> EngineResult<Snapshot> {
        let snapshot = self.store.replace_if(*revision, config).await?;
        *revision = snapshot.revision;
        Ok(snapshot)
    }

    /// Releases the current lease (best effort) and zeroes the connection.
    async fn clear(&self, revision: &mut u64, config: &AccountConfig) -> EngineResult<()> {
        debug!("Clearing connected gateway");
        if let Some(request) = config.lease_request() {
            self.spawn_delete(request);
        }
        let cleared = config.cleared();
        if &cleared != config {
            info!("Connection cleared");
        }
        self.write(revision, cleared).await?;
        Ok(())
    }

    fn spawn_delete(&self, request: LeaseRequest) {
        let authority = Arc::clone(&self.authority);
        let max_retries = self.settings.max_retries;
        let handle = tokio::spawn(async move {
            let result = call_with_retry(Operation::DeleteLease, max_retries, || {
                authority.delete_lease(&request)
            })
            .await;
            match result {
                Ok(()) => info!("Lease for gateway {} deleted", request.gateway_id),
                Err(e) => warn!("Could not delete lease for gateway {}: {e}", request.gateway_id),
            }
        });

        let mut background = self.background.lock().unwrap_or_else(|e| e.into_inner());
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("store", &self.store)
            .finish()
    }
}

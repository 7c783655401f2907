mod common;

use async_trait::async_trait;
use chrono::Duration;
use common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::mpsc;
use vpnlease_api::mock::MockAuthority;
use vpnlease_api::{ApiResult, Authority, Operation};
use vpnlease_config::ConfigStore;
use vpnlease_engine::{
    Engine, EngineConfig, EngineError, ManualTimer, NotificationKind, Outcome, RecordingSink,
    Timer, TokioTimer, Trigger,
};
use vpnlease_types::{Account, Gateway, Lease, LeaseGrant, LeaseRequest, ManualClock};

// ── Overdue recheck ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn endlessly_overdue_lease_is_bounded_by_rate_guard() {
    let h = Harness::seeded(with_gateway()).await;
    h.mock.set_lease_expiry(t0() + Duration::seconds(30));

    let err = h
        .engine
        .check_account_info(Trigger::AppStart)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::RateLimited));
    assert_eq!(h.mock.calls(Operation::RequestLease), 10);
    assert!(h.timer.scheduled().is_empty());
    assert!(h.sink.kinds().contains(&NotificationKind::LeaseExpired));
    assert!(!h.config().connected);
}

/// Grants a short lease first, then normal ones.
struct RenewingAuthority {
    inner: MockAuthority,
}

#[async_trait]
impl Authority for RenewingAuthority {
    async fn create_account(&self) -> ApiResult<Account> {
        self.inner.create_account().await
    }

    async fn account_info(&self, account_id: &str) -> ApiResult<Account> {
        self.inner.account_info(account_id).await
    }

    async fn gateways(&self) -> ApiResult<Vec<Gateway>> {
        self.inner.gateways().await
    }

    async fn leases(&self, account_id: &str) -> ApiResult<Vec<Lease>> {
        self.inner.leases(account_id).await
    }

    async fn request_lease(&self, request: &LeaseRequest) -> ApiResult<LeaseGrant> {
        let grant = self.inner.request_lease(request).await;
        self.inner.set_lease_expiry(t0() + Duration::days(1));
        grant
    }

    async fn delete_lease(&self, request: &LeaseRequest) -> ApiResult<()> {
        self.inner.delete_lease(request).await
    }
}

#[tokio::test(start_paused = true)]
async fn overdue_recheck_waits_and_runs_again() {
    let store = Arc::new(ConfigStore::in_memory());
    store.replace(with_gateway()).await.unwrap();

    let inner = MockAuthority::new();
    inner.add_account(ACCOUNT, t0() + Duration::days(30));
    inner.add_gateway(gateway(GATEWAY));
    inner.set_lease_expiry(t0() + Duration::seconds(20));
    let authority = Arc::new(RenewingAuthority { inner });
    let timer = Arc::new(ManualTimer::new());
    let sink = Arc::new(RecordingSink::new());

    let engine = Engine::with_clock(
        EngineConfig::default(),
        Arc::clone(&store),
        authority.clone(),
        timer.clone(),
        sink.clone(),
        Arc::new(ManualClock::new(t0())),
    );

    let started = tokio::time::Instant::now();
    let outcome = engine.check_account_info(Trigger::AppStart).await.unwrap();

    let expected = t0() + Duration::days(1) - Duration::seconds(60);
    assert_eq!(outcome, Outcome::Connected { next_recheck: expected });
    assert!(started.elapsed() >= std::time::Duration::from_secs(3));
    assert_eq!(authority.inner.calls(Operation::AccountInfo), 2);
    assert_eq!(authority.inner.calls(Operation::RequestLease), 2);
    assert_eq!(timer.scheduled(), vec![expected]);
    assert_eq!(sink.kinds(), vec![NotificationKind::LeaseExpired]);
    assert!(store.get().config.connected);
}

// ── Liveness and daily checks ───────────────────────────────────

#[tokio::test]
async fn liveness_does_nothing_while_lease_is_valid() {
    let h = Harness::seeded(connected(t0() + Duration::hours(6))).await;

    let outcome = h.engine.check_lease_if_needed().await.unwrap();

    assert_eq!(outcome, None);
    assert_eq!(h.mock.total_calls(), 0);
}

#[tokio::test]
async fn liveness_renews_lapsed_lease_without_account_check() {
    let h = Harness::seeded(connected(t0() + Duration::hours(6))).await;
    h.clock.advance(Duration::hours(7));

    let outcome = h.engine.check_lease_if_needed().await.unwrap();

    assert!(matches!(outcome, Some(Outcome::Connected { .. })));
    assert_eq!(h.mock.calls(Operation::AccountInfo), 0);
    assert_eq!(h.mock.calls(Operation::Gateways), 0);
    assert_eq!(h.mock.calls(Operation::Leases), 1);
    assert_eq!(h.mock.calls(Operation::RequestLease), 1);
    assert_eq!(h.sink.kinds(), vec![NotificationKind::LeaseExpired]);
    assert_eq!(h.config().lease_active_until, t0() + Duration::days(1));
}

#[tokio::test]
async fn liveness_ignores_config_without_gateway() {
    let h = Harness::new();
    h.clock.advance(Duration::days(3));

    assert_eq!(h.engine.check_lease_if_needed().await.unwrap(), None);
    assert_eq!(h.mock.total_calls(), 0);
}

#[tokio::test]
async fn first_poll_of_the_day_runs_full_check() {
    let h = Harness::seeded(connected(t0() + Duration::hours(6))).await;
    h.mock
        .add_lease(ACCOUNT, lease(PUBLIC_KEY, GATEWAY, t0() + Duration::hours(6)));

    let outcome = h.engine.periodic_check().await.unwrap();
    assert!(matches!(outcome, Some(Outcome::Connected { .. })));
    assert_eq!(h.config().last_daily_check, t0());
    assert_eq!(h.mock.calls(Operation::AccountInfo), 1);

    // Same day: only the liveness path, and the lease is still valid.
    h.clock.advance(Duration::hours(1));
    assert_eq!(h.engine.periodic_check().await.unwrap(), None);
    assert_eq!(h.mock.calls(Operation::AccountInfo), 1);

    // Next day.
    h.clock.advance(Duration::hours(12));
    h.engine.periodic_check().await.unwrap();
    assert_eq!(h.mock.calls(Operation::AccountInfo), 2);
    assert_eq!(h.config().last_daily_check, t0() + Duration::hours(13));
}

// ── Timers ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn tokio_timer_posts_scheduled_trigger_when_due() {
    let clock = ManualClock::new(t0());
    let (tx, mut rx) = mpsc::channel(4);
    let timer = TokioTimer::new(Arc::new(clock), tx);

    let started = tokio::time::Instant::now();
    timer.schedule_one_shot(t0() + Duration::seconds(5));
    assert!(timer.is_pending());

    assert_eq!(rx.recv().await, Some(Trigger::Scheduled));
    assert!(started.elapsed() >= std::time::Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn rescheduling_supersedes_pending_wake_up() {
    let clock = ManualClock::new(t0());
    let (tx, mut rx) = mpsc::channel(4);
    let timer = TokioTimer::new(Arc::new(clock), tx);

    let started = tokio::time::Instant::now();
    timer.schedule_one_shot(t0() + Duration::seconds(5));
    timer.schedule_one_shot(t0() + Duration::seconds(30));

    assert_eq!(rx.recv().await, Some(Trigger::Scheduled));
    assert!(started.elapsed() >= std::time::Duration::from_secs(30));

    let extra = tokio::time::timeout(std::time::Duration::from_secs(120), rx.recv()).await;
    assert!(extra.is_err());
}

#[tokio::test(start_paused = true)]
async fn past_wake_up_fires_immediately() {
    let clock = ManualClock::new(t0());
    let (tx, mut rx) = mpsc::channel(4);
    let timer = TokioTimer::new(Arc::new(clock), tx);

    timer.schedule_one_shot(t0() - Duration::minutes(5));

    assert_eq!(rx.recv().await, Some(Trigger::Scheduled));
}

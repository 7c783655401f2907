mod common;

use chrono::Duration;
use common::*;
use pretty_assertions::assert_eq;
use vpnlease_api::mock::MockFailure;
use vpnlease_api::Operation;
use vpnlease_config::AccountConfig;
use vpnlease_engine::{
    ClearReason, ConnectionStatus, EngineError, NotificationKind, Outcome, Trigger,
};
use vpnlease_types::LeaseRequest;

fn verified_without_gateway() -> AccountConfig {
    AccountConfig::default()
        .with_identity(ACCOUNT, "client-priv", PUBLIC_KEY)
        .with_account_verified(t0() + Duration::days(30))
}

// ── Disconnect ──────────────────────────────────────────────────

#[tokio::test]
async fn disconnect_releases_lease_once() {
    let h = Harness::seeded(connected(t0() + Duration::hours(6))).await;

    h.engine.disconnect().await.unwrap();
    h.engine.drain_background().await;
    let after_first = h.store.get();

    assert!(!after_first.config.connected);
    assert!(after_first.config.vip4.is_empty());
    assert_eq!(
        h.mock.deleted_leases(),
        vec![LeaseRequest::new(ACCOUNT, PUBLIC_KEY, GATEWAY)]
    );

    h.engine.disconnect().await.unwrap();
    h.engine.drain_background().await;

    assert_eq!(h.store.get(), after_first);
    assert_eq!(h.mock.calls(Operation::DeleteLease), 1);
}

#[tokio::test]
async fn disconnect_keeps_account_and_keys() {
    let h = Harness::seeded(connected(t0() + Duration::hours(6))).await;

    h.engine.disconnect().await.unwrap();

    let config = h.config();
    assert_eq!(config.account_id, ACCOUNT);
    assert_eq!(config.public_key, PUBLIC_KEY);
    assert_eq!(config.active_until, t0() + Duration::days(30));
    assert_eq!(h.engine.status(), ConnectionStatus::NoLease);
}

// ── Gateway selection ───────────────────────────────────────────

#[tokio::test]
async fn selecting_gateway_connects() {
    let h = Harness::seeded(verified_without_gateway()).await;

    let outcome = h.engine.select_gateway(GATEWAY).await.unwrap();

    assert!(matches!(outcome, Outcome::Connected { .. }));
    let config = h.config();
    assert!(config.connected);
    assert_eq!(config.gateway_id, GATEWAY);
    assert_eq!(config.gateway_nice_name, "Amsterdam");
    assert_eq!(config.gateway_port, 51820);
}

#[tokio::test]
async fn switching_gateway_releases_previous_lease() {
    let h = Harness::seeded(connected(t0() + Duration::hours(6))).await;
    h.mock.add_gateway(gateway("gw-two"));

    h.engine.select_gateway("gw-two").await.unwrap();
    h.engine.drain_background().await;

    assert_eq!(h.config().gateway_id, "gw-two");
    assert_eq!(
        h.mock.deleted_leases(),
        vec![LeaseRequest::new(ACCOUNT, PUBLIC_KEY, GATEWAY)]
    );
    assert_eq!(
        h.mock.requested_leases(),
        vec![LeaseRequest::new(ACCOUNT, PUBLIC_KEY, "gw-two")]
    );
}

#[tokio::test]
async fn unknown_gateway_is_refused() {
    let h = Harness::seeded(verified_without_gateway()).await;

    let err = h.engine.select_gateway("gw-nowhere").await.unwrap_err();

    assert!(matches!(err, EngineError::GatewayNotFound(ref key) if key == "gw-nowhere"));
    assert!(h.config().gateway_id.is_empty());
}

#[tokio::test]
async fn selecting_gateway_needs_an_account() {
    let h = Harness::new();
    let err = h.engine.select_gateway(GATEWAY).await.unwrap_err();
    assert!(matches!(err, EngineError::NoAccount));
    assert_eq!(h.mock.total_calls(), 0);
}

#[tokio::test]
async fn gateway_list_failure_is_reported() {
    let h = Harness::seeded(verified_without_gateway()).await;
    h.mock.fail_always(Operation::Gateways, MockFailure::Transport);

    let err = h.engine.select_gateway(GATEWAY).await.unwrap_err();

    assert!(matches!(err, EngineError::Api(_)));
    assert_eq!(h.mock.calls(Operation::Gateways), 4);
    assert_eq!(h.sink.kinds(), vec![NotificationKind::Error]);
}

// ── Restore ─────────────────────────────────────────────────────

#[tokio::test]
async fn restore_promotes_verified_account() {
    let h = Harness::seeded(connected(t0() + Duration::hours(6))).await;
    h.mock.add_account("acct-restored", t0() + Duration::days(90));

    let outcome = h.engine.restore_account(" acct-restored ").await.unwrap();
    h.engine.drain_background().await;

    assert_eq!(outcome, Outcome::Cleared(ClearReason::NoGateway));
    let config = h.config();
    assert_eq!(config.account_id, "acct-restored");
    assert!(config.restored_account_id.is_empty());
    assert_eq!(config.active_until, t0() + Duration::days(90));
    assert_eq!(config.public_key, PUBLIC_KEY);
    assert_eq!(h.mock.deleted_leases().len(), 1);
}

#[tokio::test]
async fn restore_on_fresh_install_creates_account_before_verifying() {
    let h = Harness::new();
    h.mock.add_account("acct-restored", t0() + Duration::days(90));

    let outcome = h.engine.restore_account("acct-restored").await.unwrap();

    assert_eq!(outcome, Outcome::AccountCreated);
    assert_eq!(h.mock.calls(Operation::CreateAccount), 1);
    assert_eq!(h.mock.calls(Operation::AccountInfo), 0);
    assert_eq!(h.mock.calls(Operation::Gateways), 0);
    assert_eq!(h.mock.calls(Operation::Leases), 0);
    let config = h.config();
    assert_eq!(config.account_id, "account-1");
    assert_eq!(config.restored_account_id, "acct-restored");
    assert!(!config.public_key.is_empty());

    // The next check verifies and promotes the restored account.
    let outcome = h.engine.check_account_info(Trigger::AppStart).await.unwrap();

    assert_eq!(outcome, Outcome::Cleared(ClearReason::NoGateway));
    assert_eq!(h.mock.calls(Operation::CreateAccount), 1);
    let config = h.config();
    assert_eq!(config.account_id, "acct-restored");
    assert!(config.restored_account_id.is_empty());
    assert_eq!(config.active_until, t0() + Duration::days(90));
}

#[tokio::test]
async fn pending_restore_without_account_only_creates_account() {
    let h = Harness::new();
    h.mock.add_account("acct-restored", t0() + Duration::days(90));
    let mut config = AccountConfig::default();
    config.restored_account_id = "acct-restored".to_string();
    config.private_key = "client-priv".to_string();
    config.public_key = PUBLIC_KEY.to_string();
    h.store.replace(config).await.unwrap();

    let outcome = h.engine.check_account_info(Trigger::AppStart).await.unwrap();

    assert_eq!(outcome, Outcome::AccountCreated);
    assert_eq!(h.mock.calls(Operation::CreateAccount), 1);
    assert_eq!(h.mock.total_calls(), 1);
}

#[tokio::test]
async fn unverifiable_restore_stays_pending() {
    let h = Harness::seeded(verified_without_gateway()).await;

    let err = h.engine.restore_account("acct-unknown").await.unwrap_err();

    assert!(matches!(err, EngineError::Api(ref e) if e.status() == Some(404)));
    assert_eq!(h.mock.calls(Operation::AccountInfo), 4);
    let config = h.config();
    assert_eq!(config.account_id, ACCOUNT);
    assert_eq!(config.restored_account_id, "acct-unknown");
    assert_eq!(h.engine.status(), ConnectionStatus::AccountUnverified);
    assert_eq!(
        h.sink.events(),
        vec![(NotificationKind::Error, "cannot connect".to_string())]
    );
}

#[tokio::test]
async fn blank_restore_is_rejected() {
    let h = Harness::new();
    let err = h.engine.restore_account("   ").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
    assert_eq!(h.config(), AccountConfig::default());
}

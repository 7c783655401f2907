#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use vpnlease_api::mock::MockAuthority;
use vpnlease_config::{AccountConfig, ConfigStore};
use vpnlease_engine::{Engine, EngineConfig, ManualTimer, RecordingSink};
use vpnlease_types::{Gateway, Lease, LeaseGrant, ManualClock};

pub const ACCOUNT: &str = "acct-1";
pub const GATEWAY: &str = "gw-key";
pub const PUBLIC_KEY: &str = "client-pub";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn gateway(key: &str) -> Gateway {
    Gateway {
        public_key: key.to_string(),
        ipv4: "198.51.100.7".to_string(),
        port: 51820,
        nice_name: "Amsterdam".to_string(),
    }
}

pub fn lease(public_key: &str, gateway_id: &str, expires: DateTime<Utc>) -> Lease {
    Lease {
        public_key: public_key.to_string(),
        gateway_id: gateway_id.to_string(),
        vip4: "10.143.0.2".to_string(),
        vip6: "fdad:b10c:a::2".to_string(),
        expires,
    }
}

/// An account with keys and a selected gateway, not yet leased.
pub fn with_gateway() -> AccountConfig {
    AccountConfig::default()
        .with_identity(ACCOUNT, "client-priv", PUBLIC_KEY)
        .with_account_verified(t0() + Duration::days(30))
        .with_gateway(&gateway(GATEWAY))
}

/// A connected config holding a lease until `expires`.
pub fn connected(expires: DateTime<Utc>) -> AccountConfig {
    with_gateway().with_lease(&LeaseGrant {
        vip4: "10.143.0.2".to_string(),
        vip6: "fdad:b10c:a::2".to_string(),
        expires,
    })
}

pub struct Harness {
    pub engine: Engine,
    pub store: Arc<ConfigStore>,
    pub mock: Arc<MockAuthority>,
    pub timer: Arc<ManualTimer>,
    pub sink: Arc<RecordingSink>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(ConfigStore::in_memory());
        let mock = Arc::new(MockAuthority::new());
        let timer = Arc::new(ManualTimer::new());
        let sink = Arc::new(RecordingSink::new());
        let clock = ManualClock::new(t0());

        let engine = Engine::with_clock(
            EngineConfig::default(),
            Arc::clone(&store),
            mock.clone(),
            timer.clone(),
            sink.clone(),
            Arc::new(clock.clone()),
        );

        Self {
            engine,
            store,
            mock,
            timer,
            sink,
            clock,
        }
    }

    /// Starts from `config` with the authority knowing the account and gateway.
    pub async fn seeded(config: AccountConfig) -> Self {
        let harness = Self::new();
        harness.mock.add_account(ACCOUNT, t0() + Duration::days(30));
        harness.mock.add_gateway(gateway(GATEWAY));
        harness.mock.set_lease_expiry(t0() + Duration::days(1));
        harness.store.replace(config).await.unwrap();
        harness
    }

    pub fn config(&self) -> AccountConfig {
        self.store.get().config
    }
}

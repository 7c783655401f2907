//! The process-wide config store.

use crate::error::{ConfigError, ConfigResult};
use crate::persistence::{MemoryPersistence, Persistence};
use crate::record::AccountConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

/// Persistence key of the account record.
pub const CONFIG_KEY: &str = "account:config";

/// Schema version written with the record.
pub const CONFIG_VERSION: u32 = 1;

/// A config record together with the revision it was stored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Incremented on every effective write.
    pub revision: u64,
    /// The record.
    pub config: AccountConfig,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    config: AccountConfig,
}

/// Holds the current [`AccountConfig`], persists it and notifies subscribers.
///
/// Writes are serialized; reads never block.
pub struct ConfigStore {
    persistence: Arc<dyn Persistence>,
    write_lock: Mutex<()>,
    current: watch::Sender<Snapshot>,
}

impl ConfigStore {
    /// Opens the store, loading the persisted record or starting empty.
    pub fn open(persistence: Arc<dyn Persistence>) -> ConfigResult<Self> {
        let config = match persistence.load(CONFIG_KEY)? {
            Some(raw) => {
                let envelope: Envelope = serde_json::from_str(&raw)?;
                if envelope.version > CONFIG_VERSION {
                    return Err(ConfigError::UnsupportedVersion(envelope.version));
                }
                envelope.config.validate()?;
                debug!("Loaded persisted config: {:?}", envelope.config);
                envelope.config
            }
            None => {
                info!("No persisted config, starting fresh");
                AccountConfig::default()
            }
        };

        let (current, _) = watch::channel(Snapshot {
            revision: 0,
            config,
        });

        Ok(Self {
            persistence,
            write_lock: Mutex::new(()),
            current,
        })
    }

    /// Creates an empty store that is not backed by disk.
    pub fn in_memory() -> Self {
        let persistence: Arc<dyn Persistence> = Arc::new(MemoryPersistence::new());
        let (current, _) = watch::channel(Snapshot {
            revision: 0,
            config: AccountConfig::default(),
        });
        Self {
            persistence,
            write_lock: Mutex::new(()),
            current,
        }
    }

    /// Returns the current snapshot.
    pub fn get(&self) -> Snapshot {
        self.current.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.current.subscribe()
    }

    /// Replaces the record unconditionally.
    ///
    /// Writing a record equal to the current one is a no-op and keeps the
    /// revision unchanged.
    pub async fn replace(&self, config: AccountConfig) -> ConfigResult<Snapshot> {
        let _guard = self.write_lock.lock().await;
        self.commit(config)
    }

    /// Replaces the record only if the store is still at `expected_revision`.
    pub async fn replace_if(
        &self,
        expected_revision: u64,
        config: AccountConfig,
    ) -> ConfigResult<Snapshot> {
        let _guard = self.write_lock.lock().await;
        let actual = self.current.borrow().revision;
        if actual != expected_revision {
            return Err(ConfigError::Stale {
                expected: expected_revision,
                actual,
            });
        }
        self.commit(config)
    }

    /// Applies `f` to the current record and stores the result.
    pub async fn update<F>(&self, f: F) -> ConfigResult<Snapshot>
    where
        F: FnOnce(&AccountConfig) -> AccountConfig,
    {
        let _guard = self.write_lock.lock().await;
        let next = f(&self.current.borrow().config);
        self.commit(next)
    }

    // Caller must hold `write_lock`.
    fn commit(&self, config: AccountConfig) -> ConfigResult<Snapshot> {
        config.validate()?;

        let current = self.current.borrow().clone();
        if current.config == config {
            return Ok(current);
        }

        let envelope = Envelope {
            version: CONFIG_VERSION,
            config,
        };
        let raw = serde_json::to_string(&envelope)?;
        self.persistence.save(CONFIG_KEY, &raw)?;

        let snapshot = Snapshot {
            revision: current.revision + 1,
            config: envelope.config,
        };
        debug!("Config revision {}: {:?}", snapshot.revision, snapshot.config);
        self.current.send_replace(snapshot.clone());
        Ok(snapshot)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("current", &*self.current.borrow())
            .finish()
    }
}

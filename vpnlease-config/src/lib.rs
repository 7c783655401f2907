//! Persisted account and connection state.
//!
//! This crate handles:
//! - The single [`AccountConfig`] record describing the account, the client
//!   identity, the selected gateway and the current lease
//! - Invariant validation on every write (gateway fields all-or-nothing,
//!   no lease without an account, no connection without a lease)
//! - The [`ConfigStore`]: atomic replace, persistence, change notification
//!
//! # Concurrency
//!
//! Writers are serialized by the store. Every snapshot carries a revision;
//! callers deriving a new record from an older snapshot use
//! [`ConfigStore::replace_if`] so that superseded work is discarded rather
//! than clobbering newer state.
//!
//! # Persisted Format
//!
//! The record is stored under [`CONFIG_KEY`] as
//! `{"version": 1, "config": {...}}`.

mod error;
mod persistence;
mod record;
mod store;

pub use error::{ConfigError, ConfigResult};
pub use persistence::{FilePersistence, MemoryPersistence, Persistence};
pub use record::AccountConfig;
pub use store::{ConfigStore, Snapshot, CONFIG_KEY, CONFIG_VERSION};

//! Presentation sink: where user-visible outcomes go.

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Kinds of user-visible outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AccountExpired,
    LeaseExpired,
    LeaseDeleted,
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::AccountExpired => "account expired",
            NotificationKind::LeaseExpired => "lease expired",
            NotificationKind::LeaseDeleted => "lease deleted",
            NotificationKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// Receives human-readable outcomes for display.
pub trait PresentationSink: Send + Sync {
    /// Presents one outcome. Must not block.
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl PresentationSink for TracingSink {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Error => error!("[{kind}] {message}"),
            NotificationKind::AccountExpired | NotificationKind::LeaseExpired => {
                warn!("[{kind}] {message}")
            }
            NotificationKind::LeaseDeleted => info!("[{kind}] {message}"),
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications so far, oldest first.
    pub fn events(&self) -> Vec<(NotificationKind, String)> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Kinds of all notifications so far.
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.events().into_iter().map(|(kind, _)| kind).collect()
    }
}

impl PresentationSink for RecordingSink {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((kind, message.to_string()));
    }
}

//! One-shot wake-up facility.

use crate::trigger::Trigger;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vpnlease_types::Clock;

/// Arranges a single future wake-up.
///
/// Scheduling again supersedes any pending wake-up. The handler always starts
/// from the latest stored config, so nothing is captured at schedule time.
pub trait Timer: Send + Sync {
    fn schedule_one_shot(&self, at: DateTime<Utc>);
}

/// Sleeps on the tokio runtime and posts [`Trigger::Scheduled`] when due.
pub struct TokioTimer {
    clock: Arc<dyn Clock>,
    triggers: mpsc::Sender<Trigger>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TokioTimer {
    /// Creates a timer that posts into `triggers`.
    pub fn new(clock: Arc<dyn Clock>, triggers: mpsc::Sender<Trigger>) -> Self {
        Self {
            clock,
            triggers,
            pending: Mutex::new(None),
        }
    }

    /// Returns true while a wake-up is armed.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Timer for TokioTimer {
    fn schedule_one_shot(&self, at: DateTime<Utc>) {
        let delay = (at - self.clock.now()).to_std().unwrap_or_default();
        let triggers = self.triggers.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if triggers.send(Trigger::Scheduled).await.is_err() {
                warn!("Trigger channel closed, dropping scheduled recheck");
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
        debug!("Wake-up armed in {:?}", delay);
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().ok().and_then(Option::take) {
            handle.abort();
        }
    }
}

/// Records requested wake-ups without ever firing.
#[derive(Debug, Default)]
pub struct ManualTimer {
    scheduled: Mutex<Vec<DateTime<Utc>>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wake-up requested so far.
    pub fn scheduled(&self) -> Vec<DateTime<Utc>> {
        self.scheduled.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The wake-up currently in effect.
    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.scheduled().last().copied()
    }
}

impl Timer for ManualTimer {
    fn schedule_one_shot(&self, at: DateTime<Utc>) {
        self.scheduled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(at);
    }
}

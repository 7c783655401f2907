//! Fixed-window cap on reconciliation attempts.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;
use vpnlease_types::Clock;

/// Counts attempts per window and denies once the cap is exceeded.
///
/// The guard is shared by every reconciliation step: it bounds the aggregate
/// request volume no matter which step is looping. Tripping does not reset
/// the count, so the guard stays denied until the window elapses rather than
/// admitting a fresh burst straight away.
pub struct RateGuard {
    clock: Arc<dyn Clock>,
    window: Duration,
    max_requests: u32,
    window_start: DateTime<Utc>,
    requests: u32,
}

impl RateGuard {
    /// Creates a guard allowing `max_requests` per `window`.
    pub fn new(clock: Arc<dyn Clock>, window: Duration, max_requests: u32) -> Self {
        Self {
            clock,
            window,
            max_requests,
            window_start: DateTime::<Utc>::default(),
            requests: 0,
        }
    }

    /// Records an attempt and returns whether it may proceed.
    pub fn allow(&mut self) -> bool {
        let now = self.clock.now();
        if self.window_start + self.window < now {
            self.window_start = now;
            self.requests = 0;
        }

        self.requests = self.requests.saturating_add(1);
        let allowed = self.requests <= self.max_requests;
        if !allowed {
            debug!(
                "Rate guard denied attempt {} since {}",
                self.requests, self.window_start
            );
        }
        allowed
    }

    /// Attempts counted in the current window.
    pub fn requests(&self) -> u32 {
        self.requests
    }
}

impl std::fmt::Debug for RateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGuard")
            .field("window", &self.window)
            .field("max_requests", &self.max_requests)
            .field("window_start", &self.window_start)
            .field("requests", &self.requests)
            .finish()
    }
}

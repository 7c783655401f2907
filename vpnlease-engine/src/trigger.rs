//! What started a reconciliation attempt.

use serde::Serialize;
use std::fmt;

/// The event that started a reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Process start.
    AppStart,
    /// The one-shot recheck timer fired.
    Scheduled,
    /// An explicit user action.
    User,
    /// Periodic liveness poll.
    Liveness,
    /// First periodic poll of a calendar day.
    Daily,
}

impl Trigger {
    /// Only user actions surface errors to the presentation sink.
    pub fn is_user_initiated(&self) -> bool {
        matches!(self, Trigger::User)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::AppStart => "app start",
            Trigger::Scheduled => "scheduled",
            Trigger::User => "user",
            Trigger::Liveness => "liveness",
            Trigger::Daily => "daily",
        };
        f.write_str(name)
    }
}

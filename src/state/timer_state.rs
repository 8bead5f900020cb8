//! Countdown lifecycle state

use serde::{Deserialize, Serialize};

/// Lifecycle of a countdown timer
///
/// A timer starts out `Pending`, becomes `Running` once a deadline is set and
/// ends up `Expired` when the deadline passes. Setting a new deadline re-arms
/// the timer from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    #[default]
    Pending,
    Running,
    Expired,
}

impl TimerState {
    /// Check if the timer is counting down
    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running)
    }

    /// Check if the deadline has passed
    pub fn is_expired(&self) -> bool {
        matches!(self, TimerState::Expired)
    }
}

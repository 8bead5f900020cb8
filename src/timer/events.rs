//! Countdown notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::state::RemainingDuration;

/// Notification published by a countdown timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    /// Periodic update carrying the freshly computed remaining time
    Tick { remaining: RemainingDuration },
    /// The deadline passed. Published once per armed deadline.
    Expired { deadline: DateTime<Utc> },
}

impl TimerEvent {
    /// Short name, used as the SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::Tick { .. } => "tick",
            TimerEvent::Expired { .. } => "expired",
        }
    }
}

/// Receiver of countdown notifications.
///
/// Callbacks run while the timer holds its internal lock: they must not block
/// and must not call back into the same timer.
pub trait TimerListener: Send + Sync + 'static {
    fn on_tick(&self, remaining: RemainingDuration);
    fn on_expired(&self, deadline: DateTime<Utc>);
}

impl TimerListener for broadcast::Sender<TimerEvent> {
    fn on_tick(&self, remaining: RemainingDuration) {
        if self.send(TimerEvent::Tick { remaining }).is_err() {
            debug!("No subscribers for tick notification");
        }
    }

    fn on_expired(&self, deadline: DateTime<Utc>) {
        if self.send(TimerEvent::Expired { deadline }).is_err() {
            debug!("No subscribers for expiry notification");
        }
    }
}

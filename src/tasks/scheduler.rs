//! Repeating callback scheduling on the tokio runtime

use std::{ops::ControlFlow, time::Duration};
use tokio::{
    runtime::Handle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Callback invoked on every period of a repeating schedule.
/// Returning `ControlFlow::Break` ends the schedule.
pub type TickCallback = Box<dyn FnMut() -> ControlFlow<()> + Send + 'static>;

/// Host primitive for "invoke this every N milliseconds" with cancellation
pub trait Scheduler: Send + Sync {
    /// Run `callback` once per `period`, starting one full period from now
    fn schedule_repeating(&self, period: Duration, callback: TickCallback) -> ScheduledTask;
}

/// Handle to an armed repeating schedule
pub struct ScheduledTask {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl ScheduledTask {
    /// Wrap the action that tears the schedule down
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop the schedule. Calling this more than once is a no-op.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Scheduler backed by `tokio::time::interval`
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Schedule onto the given runtime
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Schedule onto the runtime we are currently running inside.
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, mut callback: TickCallback) -> ScheduledTask {
        let task = self.handle.spawn(async move {
            // First callback fires after a full period, not immediately
            let mut interval = interval_at(Instant::now() + period, period);
            // Every tick recomputes from an absolute deadline, so bursts of
            // missed ticks carry no information
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if callback().is_break() {
                    debug!("Repeating schedule finished");
                    break;
                }
            }
        });

        let abort = task.abort_handle();
        ScheduledTask::new(move || abort.abort())
    }
}

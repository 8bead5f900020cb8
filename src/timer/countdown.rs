//! Live countdown to a deadline

use std::{
    ops::ControlFlow,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::{clock::Clock, events::TimerListener};
use crate::{
    state::{RemainingDuration, TimerState},
    tasks::{ScheduledTask, Scheduler},
};

/// Default interval between two ticks
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Point-in-time view of a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub deadline: Option<DateTime<Utc>>,
    pub remaining: RemainingDuration,
}

#[derive(Debug, Default)]
struct Inner {
    deadline: Option<DateTime<Utc>>,
    state: TimerState,
    remaining: RemainingDuration,
    /// Bumped whenever the active schedule is cancelled or replaced.
    /// Callbacks carrying an older generation do nothing.
    generation: u64,
    schedule: Option<ScheduledTask>,
}

impl Inner {
    fn cancel_schedule(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(mut schedule) = self.schedule.take() {
            schedule.cancel();
        }
    }

    fn expire(&mut self, deadline: DateTime<Utc>, listener: &dyn TimerListener) {
        self.remaining = RemainingDuration::ZERO;
        self.cancel_schedule();

        if self.state.is_expired() {
            return;
        }

        self.state = TimerState::Expired;
        listener.on_tick(RemainingDuration::ZERO);
        listener.on_expired(deadline);
    }
}

/// Countdown that republishes the time left until a deadline once per tick
/// and announces the deadline passing exactly once.
///
/// Remaining time is always recomputed from the absolute deadline and the
/// clock, so late ticks never accumulate drift. All notifications are emitted
/// while the timer's lock is held; once [`CountdownTimer::stop`] returns no
/// further notification for the previous schedule can be observed.
pub struct CountdownTimer {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    listener: Arc<dyn TimerListener>,
    period: Duration,
}

impl CountdownTimer {
    /// Create a pending timer ticking every [`DEFAULT_TICK_PERIOD`]
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        listener: Arc<dyn TimerListener>,
    ) -> Self {
        Self::with_period(clock, scheduler, listener, DEFAULT_TICK_PERIOD)
    }

    pub fn with_period(
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        listener: Arc<dyn TimerListener>,
        period: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
            scheduler,
            listener,
            period,
        }
    }

    /// Arm the timer for `deadline`, replacing any previous one.
    ///
    /// A deadline at or before now expires the timer immediately, before this
    /// call returns.
    pub fn set_deadline(&self, deadline: DateTime<Utc>) {
        let mut inner = self.lock();
        inner.cancel_schedule();
        inner.deadline = Some(deadline);

        let remaining = RemainingDuration::until(deadline, self.clock.now());
        if remaining.is_expired() {
            info!("Deadline {} already passed, expiring immediately", deadline);
            // Re-arming clears a previous expiry so the new deadline is announced
            inner.state = TimerState::Running;
            inner.expire(deadline, self.listener.as_ref());
            return;
        }

        info!("Countdown armed for {} ({} left)", deadline, remaining);
        inner.state = TimerState::Running;
        inner.remaining = remaining;
        self.listener.on_tick(remaining);

        let generation = inner.generation;
        let shared = Arc::clone(&self.inner);
        let clock = Arc::clone(&self.clock);
        let listener = Arc::clone(&self.listener);
        let schedule = self.scheduler.schedule_repeating(
            self.period,
            Box::new(move || tick(&shared, generation, clock.as_ref(), listener.as_ref())),
        );
        inner.schedule = Some(schedule);
    }

    /// Cancel the active schedule without touching the lifecycle state.
    /// Safe to call repeatedly and when nothing is scheduled.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if inner.schedule.is_some() {
            debug!("Stopping countdown schedule");
        }
        inner.cancel_schedule();
    }

    /// The last computed remaining time
    pub fn current_remaining(&self) -> RemainingDuration {
        self.lock().remaining
    }

    pub fn state(&self) -> TimerState {
        self.lock().state
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.lock().deadline
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let inner = self.lock();
        TimerSnapshot {
            state: inner.state,
            deadline: inner.deadline,
            remaining: inner.remaining,
        }
    }

    /// Whether a repeating schedule is currently armed
    pub fn is_ticking(&self) -> bool {
        self.lock().schedule.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("snapshot", &self.snapshot())
            .field("period", &self.period)
            .finish()
    }
}

// Poisoning only means a listener panicked mid-notification
fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

fn tick(
    shared: &Mutex<Inner>,
    generation: u64,
    clock: &dyn Clock,
    listener: &dyn TimerListener,
) -> ControlFlow<()> {
    let mut inner = lock_inner(shared);
    if inner.generation != generation {
        return ControlFlow::Break(());
    }

    let Some(deadline) = inner.deadline else {
        return ControlFlow::Break(());
    };

    let remaining = RemainingDuration::until(deadline, clock.now());
    if remaining.is_expired() {
        info!("Deadline {} reached", deadline);
        inner.expire(deadline, listener);
        return ControlFlow::Break(());
    }

    inner.remaining = remaining;
    listener.on_tick(remaining);
    ControlFlow::Continue(())
}

//! Countdown timer module
//!
//! A [`CountdownTimer`] recomputes the time left until a deadline on every
//! tick and notifies a [`TimerListener`], using a [`Clock`] for the current
//! time and a [`Scheduler`](crate::tasks::Scheduler) for the repeating tick.

pub mod clock;
pub mod countdown;
pub mod events;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use countdown::{CountdownTimer, TimerSnapshot, DEFAULT_TICK_PERIOD};
pub use events::{TimerEvent, TimerListener};

//! Background tasks module
//!
//! This module contains the repeating schedules that drive countdown ticks.

pub mod scheduler;

// Re-export main types
pub use scheduler::{ScheduledTask, Scheduler, TickCallback, TokioScheduler};

//! Remaining time until a deadline, split into display units

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Time left until a deadline.
///
/// The unit fields are floored from `total_milliseconds` without any calendar
/// rules, so a day is always 86 400 000 ms. Once the deadline has passed every
/// field is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemainingDuration {
    pub total_milliseconds: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl RemainingDuration {
    /// A fully elapsed countdown
    pub const ZERO: Self = Self {
        total_milliseconds: 0,
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Decompose a signed millisecond total. Non-positive totals collapse to zero.
    pub fn from_millis(total: i64) -> Self {
        if total <= 0 {
            return Self::ZERO;
        }

        let total = total as u64;
        Self {
            total_milliseconds: total,
            days: total / MS_PER_DAY,
            hours: (total % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (total % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (total % MS_PER_MINUTE) / MS_PER_SECOND,
        }
    }

    /// Time left from `now` until `deadline`
    pub fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::from_millis((deadline - now).num_milliseconds())
    }

    /// Whether the deadline has been reached
    pub fn is_expired(&self) -> bool {
        self.total_milliseconds == 0
    }
}

impl fmt::Display for RemainingDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {}h {}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

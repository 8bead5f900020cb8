//! State management module
//!
//! This module contains the auction registry and the value types it hands out.

pub mod app_state;
pub mod feed;
pub mod remaining;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, AuctionEvent, AuctionId, AuctionSnapshot, EVENT_CHANNEL_CAPACITY};
pub use feed::AuctionFeed;
pub use remaining::RemainingDuration;
pub use timer_state::TimerState;

//! Auction Clock - A state-managed HTTP server for auction countdowns
//!
//! This library keeps one live countdown per auction deadline, republishes the
//! remaining time on every tick and announces each deadline passing exactly once.

pub mod config;
pub mod state;
pub mod api;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
pub use api::create_router;
pub use timer::CountdownTimer;
pub use utils::signals::shutdown_signal;

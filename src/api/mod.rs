//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auctions", get(list_auctions_handler))
        .route(
            "/auctions/:auction_id",
            get(get_auction_handler).delete(remove_auction_handler),
        )
        .route("/auctions/:auction_id/deadline", put(set_deadline_handler))
        .route("/auctions/:auction_id/stop", post(stop_auction_handler))
        .route("/auctions/:auction_id/events", get(auction_events_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

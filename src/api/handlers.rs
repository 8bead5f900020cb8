//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tracing::{error, info, warn};

use crate::state::{AppState, AuctionFeed, AuctionId, AuctionSnapshot};
use super::responses::{AuctionResponse, DeadlineRequest, HealthResponse, StatusResponse};

/// Handle PUT /auctions/:auction_id/deadline - Arm or re-arm an auction countdown
pub async fn set_deadline_handler(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<AuctionId>,
    Json(request): Json<DeadlineRequest>,
) -> Result<Json<AuctionResponse>, StatusCode> {
    let Some(deadline) = request.deadline() else {
        warn!("Deadline for auction {} is out of range: {:?}", auction_id, request);
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    match state.set_deadline(auction_id, deadline) {
        Ok(auction) => {
            info!("Deadline endpoint called - auction {} ends at {}", auction_id, deadline);
            let message = if auction.state.is_expired() {
                "Auction has ended"
            } else {
                "Countdown started"
            };
            Ok(Json(AuctionResponse::new(message.to_string(), auction)))
        }
        Err(e) => {
            error!("Failed to set deadline for auction {}: {}", auction_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /auctions/:auction_id - Return one auction countdown
pub async fn get_auction_handler(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<AuctionSnapshot>, StatusCode> {
    match state.get_auction(auction_id) {
        Ok(Some(auction)) => Ok(Json(auction)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to get auction {}: {}", auction_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /auctions - Return every auction countdown
pub async fn list_auctions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AuctionSnapshot>>, StatusCode> {
    state.list_auctions().map(Json).map_err(|e| {
        error!("Failed to list auctions: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Handle POST /auctions/:auction_id/stop - Stop ticking without forgetting the auction
pub async fn stop_auction_handler(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<AuctionResponse>, StatusCode> {
    match state.stop_auction(auction_id) {
        Ok(Some(auction)) => Ok(Json(AuctionResponse::new(
            "Countdown stopped".to_string(),
            auction,
        ))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to stop auction {}: {}", auction_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle DELETE /auctions/:auction_id - Stop and unregister an auction countdown
pub async fn remove_auction_handler(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<AuctionId>,
) -> StatusCode {
    match state.remove_auction(auction_id) {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            error!("Failed to remove auction {}: {}", auction_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Handle GET /auctions/:auction_id/events - Stream countdown notifications as SSE
///
/// The stream opens with the auction's current state, so a client connecting
/// after the deadline still receives the `expired` event.
pub async fn auction_events_handler(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, StatusCode> {
    let feed = AuctionFeed::open(state, auction_id).map_err(|e| {
        error!("Failed to open event stream for auction {}: {}", auction_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let events = stream::unfold(feed, |mut feed| async move {
        let event = feed.next().await?;
        let sse = Event::default()
            .event(event.event.name())
            .json_data(&event);
        Some((sse, feed))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Handle GET /status - Return registry and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let (pending, running, expired) = match state.count_by_state() {
        Ok(counts) => counts,
        Err(e) => {
            error!("Failed to count auctions: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        auctions: pending + running + expired,
        pending,
        running,
        expired,
        tick_ms: u64::try_from(state.tick_period.as_millis()).unwrap_or(u64::MAX),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

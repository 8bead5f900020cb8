//! Auction Clock - A state-managed HTTP server for auction countdowns
//!
//! This is the main entry point for the auction-clock application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use auction_clock::{
    api::create_router,
    config::Config,
    state::AppState,
    tasks::TokioScheduler,
    timer::SystemClock,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("auction_clock={},tower_http=info", config.log_level()))
        .init();

    info!("Starting auction-clock server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, tick={}ms",
          config.host, config.port, config.tick_ms);

    // The registry owns every countdown; nothing is registered globally
    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        config.tick_period(),
        Arc::new(SystemClock),
        Arc::new(TokioScheduler::current()),
    ));

    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  PUT    /auctions/:id/deadline - Start or replace an auction countdown");
    info!("  GET    /auctions              - List auction countdowns");
    info!("  GET    /auctions/:id          - Current remaining time");
    info!("  POST   /auctions/:id/stop     - Stop ticking");
    info!("  DELETE /auctions/:id          - Stop and forget an auction");
    info!("  GET    /auctions/:id/events   - Server-sent tick and expiry events");
    info!("  GET    /status                - Registry status");
    info!("  GET    /health                - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = state.stop_all() {
        tracing::error!("Failed to stop countdowns: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

//! Main application state: the registry of auction countdowns

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{RemainingDuration, TimerState};
use crate::{
    tasks::Scheduler,
    timer::{Clock, CountdownTimer, TimerEvent, TimerListener},
};

/// Identifier of an auction as used by the marketplace backend
pub type AuctionId = u64;

/// Capacity of each auction's notification channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Countdown notification tagged with the auction it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionEvent {
    pub auction_id: AuctionId,
    #[serde(flatten)]
    pub event: TimerEvent,
}

/// Public view of one auction's countdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSnapshot {
    pub auction_id: AuctionId,
    pub state: TimerState,
    pub deadline: Option<DateTime<Utc>>,
    pub remaining: RemainingDuration,
    /// Human readable remaining time, e.g. "2d 4h 13m 07s"
    pub display: String,
    /// Bids are only accepted until the deadline passes
    pub bidding_open: bool,
}

impl AuctionSnapshot {
    /// Build a snapshot; `now` decides whether bidding is still open, so a
    /// stopped countdown whose deadline has passed reports bidding closed
    fn of(auction_id: AuctionId, timer: &CountdownTimer, now: DateTime<Utc>) -> Self {
        let snapshot = timer.snapshot();
        Self {
            auction_id,
            state: snapshot.state,
            deadline: snapshot.deadline,
            remaining: snapshot.remaining,
            display: snapshot.remaining.to_string(),
            bidding_open: snapshot.deadline.is_some_and(|deadline| now < deadline),
        }
    }

    /// Notifications that bring a subscriber up to date with this snapshot
    pub fn replay(&self) -> Vec<AuctionEvent> {
        let tagged = |event| AuctionEvent {
            auction_id: self.auction_id,
            event,
        };

        match (self.state, self.deadline) {
            (TimerState::Expired, Some(deadline)) => vec![
                tagged(TimerEvent::Tick { remaining: RemainingDuration::ZERO }),
                tagged(TimerEvent::Expired { deadline }),
            ],
            (TimerState::Running, Some(_)) => vec![tagged(TimerEvent::Tick {
                remaining: self.remaining,
            })],
            _ => Vec::new(),
        }
    }
}

/// Forwards one timer's notifications onto its auction's channel
struct AuctionNotifier {
    auction_id: AuctionId,
    tx: broadcast::Sender<AuctionEvent>,
}

impl AuctionNotifier {
    fn publish(&self, event: TimerEvent) {
        let event = AuctionEvent {
            auction_id: self.auction_id,
            event,
        };
        if self.tx.send(event).is_err() {
            debug!("No subscribers for auction {} notification", self.auction_id);
        }
    }
}

impl TimerListener for AuctionNotifier {
    fn on_tick(&self, remaining: RemainingDuration) {
        self.publish(TimerEvent::Tick { remaining });
    }

    fn on_expired(&self, deadline: DateTime<Utc>) {
        info!("Auction {} ended at {}", self.auction_id, deadline);
        self.publish(TimerEvent::Expired { deadline });
    }
}

/// Main application state holding one countdown per auction
pub struct AppState {
    /// Countdown timers keyed by auction
    pub auctions: Arc<Mutex<BTreeMap<AuctionId, CountdownTimer>>>,
    /// Time source and tick driver shared by every countdown
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    pub tick_period: Duration,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// One notification channel per auction, created on first use
    channels: Mutex<BTreeMap<AuctionId, broadcast::Sender<AuctionEvent>>>,
}

impl AppState {
    /// Create an empty registry
    pub fn new(
        port: u16,
        host: String,
        tick_period: Duration,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            auctions: Arc::new(Mutex::new(BTreeMap::new())),
            clock,
            scheduler,
            tick_period,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            channels: Mutex::new(BTreeMap::new()),
        }
    }

    /// Subscribe to one auction's notifications.
    ///
    /// The snapshot is taken after subscribing: anything that happens after it
    /// reaches the receiver, so replaying the snapshot first loses nothing.
    pub fn subscribe(
        &self,
        auction_id: AuctionId,
    ) -> Result<(Option<AuctionSnapshot>, broadcast::Receiver<AuctionEvent>), String> {
        let rx = self.channel(auction_id)?.subscribe();
        let snapshot = self.get_auction(auction_id)?;
        Ok((snapshot, rx))
    }

    fn channel(&self, auction_id: AuctionId) -> Result<broadcast::Sender<AuctionEvent>, String> {
        let mut channels = self.channels.lock()
            .map_err(|e| format!("Failed to lock auction channels: {}", e))?;

        Ok(channels
            .entry(auction_id)
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0)
            .clone())
    }

    /// Set or replace the deadline of an auction, creating its countdown on first use
    pub fn set_deadline(
        &self,
        auction_id: AuctionId,
        deadline: DateTime<Utc>,
    ) -> Result<AuctionSnapshot, String> {
        let tx = self.channel(auction_id)?;
        let mut auctions = self.auctions.lock()
            .map_err(|e| format!("Failed to lock auction registry: {}", e))?;

        let timer = auctions.entry(auction_id).or_insert_with(|| {
            info!("Registering countdown for auction {}", auction_id);
            CountdownTimer::with_period(
                Arc::clone(&self.clock),
                Arc::clone(&self.scheduler),
                Arc::new(AuctionNotifier { auction_id, tx }),
                self.tick_period,
            )
        });

        timer.set_deadline(deadline);
        let snapshot = AuctionSnapshot::of(auction_id, timer, self.clock.now());
        drop(auctions);

        self.record_action(format!("deadline:{}", auction_id));
        Ok(snapshot)
    }

    /// Get one auction's countdown
    pub fn get_auction(&self, auction_id: AuctionId) -> Result<Option<AuctionSnapshot>, String> {
        self.auctions.lock()
            .map(|auctions| {
                auctions
                    .get(&auction_id)
                    .map(|timer| AuctionSnapshot::of(auction_id, timer, self.clock.now()))
            })
            .map_err(|e| format!("Failed to lock auction registry: {}", e))
    }

    /// Get every registered countdown, ordered by auction id
    pub fn list_auctions(&self) -> Result<Vec<AuctionSnapshot>, String> {
        self.auctions.lock()
            .map(|auctions| {
                auctions
                    .iter()
                    .map(|(id, timer)| AuctionSnapshot::of(*id, timer, self.clock.now()))
                    .collect()
            })
            .map_err(|e| format!("Failed to lock auction registry: {}", e))
    }

    /// Stop ticking for an auction while keeping its countdown registered
    pub fn stop_auction(&self, auction_id: AuctionId) -> Result<Option<AuctionSnapshot>, String> {
        let auctions = self.auctions.lock()
            .map_err(|e| format!("Failed to lock auction registry: {}", e))?;

        let snapshot = auctions.get(&auction_id).map(|timer| {
            timer.stop();
            AuctionSnapshot::of(auction_id, timer, self.clock.now())
        });
        drop(auctions);

        if snapshot.is_some() {
            info!("Stopped countdown for auction {}", auction_id);
            self.record_action(format!("stop:{}", auction_id));
        }
        Ok(snapshot)
    }

    /// Stop and unregister an auction's countdown
    pub fn remove_auction(&self, auction_id: AuctionId) -> Result<bool, String> {
        let removed = self.auctions.lock()
            .map_err(|e| format!("Failed to lock auction registry: {}", e))?
            .remove(&auction_id);

        // Dropping the channel ends every open event stream for this auction
        match self.channels.lock() {
            Ok(mut channels) => {
                channels.remove(&auction_id);
            }
            Err(e) => warn!("Failed to lock auction channels: {}", e),
        }

        match removed {
            Some(timer) => {
                timer.stop();
                info!("Removed countdown for auction {}", auction_id);
                self.record_action(format!("remove:{}", auction_id));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stop every countdown, used on shutdown
    pub fn stop_all(&self) -> Result<usize, String> {
        let auctions = self.auctions.lock()
            .map_err(|e| format!("Failed to lock auction registry: {}", e))?;

        for timer in auctions.values() {
            timer.stop();
        }

        info!("Stopped {} countdown(s)", auctions.len());
        Ok(auctions.len())
    }

    /// Count registered auctions by lifecycle state
    pub fn count_by_state(&self) -> Result<(usize, usize, usize), String> {
        let auctions = self.auctions.lock()
            .map_err(|e| format!("Failed to lock auction registry: {}", e))?;

        Ok(auctions.values().fold((0, 0, 0), |(pending, running, expired), timer| {
            match timer.state() {
                TimerState::Pending => (pending + 1, running, expired),
                TimerState::Running => (pending, running + 1, expired),
                TimerState::Expired => (pending, running, expired + 1),
            }
        }))
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    fn record_action(&self, action: String) {
        match self.last_action.lock() {
            Ok(mut last_action) => *last_action = Some(action),
            Err(e) => warn!("Failed to record last action: {}", e),
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(self.clock.now());
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auctions", &self.auctions)
            .field("tick_period", &self.tick_period)
            .field("port", &self.port)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

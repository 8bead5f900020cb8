//! Per-auction notification feed with catch-up

use std::{collections::VecDeque, sync::Arc};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, warn};

use super::{AppState, AuctionEvent, AuctionId};

/// Stream of one auction's notifications for a single subscriber.
///
/// Opens with the auction's current snapshot replayed as events, so a late
/// subscriber still sees an expiry that already happened. When the subscriber
/// falls behind the channel, the current snapshot is replayed again instead of
/// silently skipping what was dropped.
pub struct AuctionFeed {
    state: Arc<AppState>,
    auction_id: AuctionId,
    rx: Receiver<AuctionEvent>,
    backlog: VecDeque<AuctionEvent>,
}

impl AuctionFeed {
    pub fn open(state: Arc<AppState>, auction_id: AuctionId) -> Result<Self, String> {
        let (snapshot, rx) = state.subscribe(auction_id)?;
        let backlog = snapshot.map(|s| s.replay()).unwrap_or_default().into();
        debug!("Feed opened for auction {}", auction_id);

        Ok(Self {
            state,
            auction_id,
            rx,
            backlog,
        })
    }

    /// Next notification, or `None` once the auction is removed
    pub async fn next(&mut self) -> Option<AuctionEvent> {
        loop {
            if let Some(event) = self.backlog.pop_front() {
                return Some(event);
            }

            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Feed for auction {} skipped {} notification(s), resending current state",
                        self.auction_id, skipped
                    );
                    match self.state.get_auction(self.auction_id) {
                        Ok(Some(snapshot)) => self.backlog.extend(snapshot.replay()),
                        Ok(None) => return None,
                        Err(e) => {
                            warn!("Failed to resync auction {} feed: {}", self.auction_id, e);
                            return None;
                        }
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use chrono::{DateTime, TimeDelta, Utc};

    use super::AuctionFeed;
    use crate::{
        state::{AppState, AuctionEvent, RemainingDuration, EVENT_CHANNEL_CAPACITY},
        tasks::TokioScheduler,
        timer::{TimerEvent, TokioClock},
    };

    fn start() -> DateTime<Utc> {
        "2025-05-01T10:00:00Z".parse().unwrap()
    }

    fn registry() -> Arc<AppState> {
        Arc::new(AppState::new(
            20560,
            "127.0.0.1".to_string(),
            Duration::from_secs(1),
            Arc::new(TokioClock::new(start())),
            Arc::new(TokioScheduler::current()),
        ))
    }

    fn tagged(auction_id: u64, event: TimerEvent) -> AuctionEvent {
        AuctionEvent { auction_id, event }
    }

    #[tokio::test(start_paused = true)]
    async fn late_subscriber_sees_expiry() {
        let state = registry();
        let deadline = start() - TimeDelta::seconds(1);
        state.set_deadline(5, deadline).unwrap();

        let mut feed = AuctionFeed::open(Arc::clone(&state), 5).unwrap();

        assert_eq!(
            feed.next().await,
            Some(tagged(5, TimerEvent::Tick { remaining: RemainingDuration::ZERO }))
        );
        assert_eq!(
            feed.next().await,
            Some(tagged(5, TimerEvent::Expired { deadline }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn other_auctions_cannot_crowd_out_expiry() {
        let state = registry();
        let mut feed = AuctionFeed::open(Arc::clone(&state), 0).unwrap();
        let deadline = start() - TimeDelta::seconds(1);

        state.set_deadline(0, deadline).unwrap();
        for auction_id in 1..=1_100 {
            state.set_deadline(auction_id, start() + TimeDelta::hours(1)).unwrap();
        }

        assert_eq!(
            feed.next().await,
            Some(tagged(0, TimerEvent::Tick { remaining: RemainingDuration::ZERO }))
        );
        assert_eq!(
            feed.next().await,
            Some(tagged(0, TimerEvent::Expired { deadline }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn lagging_subscriber_gets_current_state_first() {
        let state = registry();
        let mut feed = AuctionFeed::open(Arc::clone(&state), 9).unwrap();

        // Overflow this auction's channel with re-arms, then expire it
        for minutes in 1..=(EVENT_CHANNEL_CAPACITY as i64 + 10) {
            state.set_deadline(9, start() + TimeDelta::minutes(minutes)).unwrap();
        }
        let deadline = start() - TimeDelta::seconds(1);
        state.set_deadline(9, deadline).unwrap();

        assert_eq!(
            feed.next().await,
            Some(tagged(9, TimerEvent::Tick { remaining: RemainingDuration::ZERO }))
        );
        assert_eq!(
            feed.next().await,
            Some(tagged(9, TimerEvent::Expired { deadline }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn removing_the_auction_ends_the_feed() {
        let state = registry();
        state.set_deadline(3, start() + TimeDelta::minutes(1)).unwrap();
        let mut feed = AuctionFeed::open(Arc::clone(&state), 3).unwrap();

        // Replay of the running countdown
        assert!(matches!(
            feed.next().await,
            Some(AuctionEvent { event: TimerEvent::Tick { .. }, .. })
        ));

        state.remove_auction(3).unwrap();

        assert_eq!(feed.next().await, None);
    }
}

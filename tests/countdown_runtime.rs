//! Countdown timers driven by the tokio scheduler under paused time

use std::{sync::Arc, time::Duration};

use auction_clock::{
    state::{RemainingDuration, TimerState},
    tasks::TokioScheduler,
    timer::{Clock, CountdownTimer, TimerEvent, TokioClock},
};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::broadcast::{self, error::TryRecvError, Receiver};

fn timer_with_events() -> (CountdownTimer, TokioClock, Receiver<TimerEvent>) {
    let anchor: DateTime<Utc> = "2025-05-01T10:00:00Z".parse().unwrap();
    let clock = TokioClock::new(anchor);
    let (tx, rx) = broadcast::channel(8192);
    let timer = CountdownTimer::new(
        Arc::new(clock.clone()),
        Arc::new(TokioScheduler::current()),
        Arc::new(tx),
    );
    (timer, clock, rx)
}

fn drain(rx: &mut Receiver<TimerEvent>) -> Vec<TimerEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) => return events,
            Err(e) => panic!("unexpected receive error: {e}"),
        }
    }
}

fn expiries(events: &[TimerEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, TimerEvent::Expired { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn one_hour_countdown_expires_exactly_once() {
    let (timer, clock, mut rx) = timer_with_events();
    let deadline = clock.now() + TimeDelta::milliseconds(3_661_000);

    timer.set_deadline(deadline);
    let remaining = timer.current_remaining();
    assert_eq!((remaining.days, remaining.hours, remaining.minutes, remaining.seconds), (0, 1, 1, 1));

    tokio::time::sleep(Duration::from_secs(3_661)).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    let events = drain(&mut rx);
    assert_eq!(expiries(&events), 1);
    assert_eq!(events.last(), Some(&TimerEvent::Expired { deadline }));
    assert_eq!(timer.current_remaining(), RemainingDuration::ZERO);
    assert_eq!(timer.state(), TimerState::Expired);
    assert!(!timer.is_ticking());
}

#[tokio::test(start_paused = true)]
async fn publishes_one_tick_per_second() {
    let (timer, clock, mut rx) = timer_with_events();
    timer.set_deadline(clock.now() + TimeDelta::minutes(10));

    tokio::time::sleep(Duration::from_millis(5_500)).await;

    let events = drain(&mut rx);
    // The immediate tick on arming plus five scheduled ones
    assert_eq!(events.len(), 6);
    assert_eq!(
        events.last(),
        Some(&TimerEvent::Tick {
            remaining: RemainingDuration::from_millis(595_000)
        })
    );
}

#[tokio::test(start_paused = true)]
async fn past_deadline_leaves_nothing_scheduled() {
    let (timer, clock, mut rx) = timer_with_events();
    let deadline = clock.now() - TimeDelta::milliseconds(5_000);

    timer.set_deadline(deadline);

    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![
            TimerEvent::Tick { remaining: RemainingDuration::ZERO },
            TimerEvent::Expired { deadline },
        ]
    );
    assert!(!timer.is_ticking());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_silences_the_timer() {
    let (timer, clock, mut rx) = timer_with_events();
    timer.set_deadline(clock.now() + TimeDelta::seconds(5));
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    timer.stop();
    timer.stop();
    drain(&mut rx);

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(drain(&mut rx).is_empty());
    assert_eq!(timer.state(), TimerState::Running);
    assert_eq!(timer.current_remaining().seconds, 4);
}

#[tokio::test(start_paused = true)]
async fn rearming_after_expiry_resumes_ticks() {
    let (timer, clock, mut rx) = timer_with_events();
    timer.set_deadline(clock.now() + TimeDelta::seconds(1));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(timer.state(), TimerState::Expired);
    drain(&mut rx);

    timer.set_deadline(clock.now() + TimeDelta::seconds(30));
    assert_eq!(timer.state(), TimerState::Running);

    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 3);
    assert_eq!(expiries(&events), 0);
    assert_eq!(timer.current_remaining().seconds, 28);
}

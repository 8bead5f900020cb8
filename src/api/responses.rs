//! API request and response structures

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AuctionSnapshot;

/// Body of `PUT /auctions/:auction_id/deadline`
///
/// Either an absolute end time, or the auction's creation time plus its
/// duration in seconds as stored by the marketplace backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DeadlineRequest {
    EndTime {
        end_time: DateTime<Utc>,
    },
    Duration {
        created_at: DateTime<Utc>,
        auction_duration: u64,
    },
}

impl DeadlineRequest {
    /// Resolve to an absolute deadline. `None` if the duration overflows.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match self {
            DeadlineRequest::EndTime { end_time } => Some(*end_time),
            DeadlineRequest::Duration { created_at, auction_duration } => {
                let seconds = i64::try_from(*auction_duration).ok()?;
                created_at.checked_add_signed(TimeDelta::try_seconds(seconds)?)
            }
        }
    }
}

/// Response for endpoints acting on a single auction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub auction: AuctionSnapshot,
}

impl AuctionResponse {
    pub fn new(message: String, auction: AuctionSnapshot) -> Self {
        Self {
            message,
            timestamp: Utc::now(),
            auction,
        }
    }
}

/// Status response with registry counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub auctions: usize,
    pub pending: usize,
    pub running: usize,
    pub expired: usize,
    pub tick_ms: u64,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, Utc};

    use super::DeadlineRequest;

    #[test]
    fn end_time_body() {
        let request: DeadlineRequest =
            serde_json::from_str(r#"{"end_time": "2025-05-01T12:00:00Z"}"#).unwrap();
        let expected: DateTime<Utc> = "2025-05-01T12:00:00Z".parse().unwrap();

        assert_eq!(request.deadline(), Some(expected));
    }

    #[test]
    fn created_at_plus_duration_body() {
        let request: DeadlineRequest = serde_json::from_str(
            r#"{"created_at": "2025-05-01T12:00:00Z", "auction_duration": 86400}"#,
        )
        .unwrap();
        let expected: DateTime<Utc> = "2025-05-02T12:00:00Z".parse().unwrap();

        assert_eq!(request.deadline(), Some(expected));
    }

    #[test]
    fn overflowing_duration_has_no_deadline() {
        let request = DeadlineRequest::Duration {
            created_at: "2025-05-01T12:00:00Z".parse().unwrap(),
            auction_duration: u64::MAX,
        };

        assert_eq!(request.deadline(), None);
    }
}

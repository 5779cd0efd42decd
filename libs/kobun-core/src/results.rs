//! Finished-session payload for the results sink.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::types::{AttemptRecord, Score};

/// Offset of the timestamps written to the results sheet (+09:00).
const SHEET_OFFSET_HOURS: i64 = 9;

/// Record handed to the results sink once a session is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub subject: String,
    pub timestamp: String,
    pub user_name: String,
    pub total: usize,
    pub correct: usize,
    pub percent: u32,
    pub history: Vec<AttemptRecord>,
    pub device_info: String,
}

impl ResultPayload {
    pub fn new(
        subject: impl Into<String>,
        user_name: impl Into<String>,
        score: Score,
        history: Vec<AttemptRecord>,
        device_info: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.into(),
            timestamp: format_timestamp(now),
            user_name: user_name.into(),
            total: score.total,
            correct: score.correct,
            percent: score.percent,
            history,
            device_info: device_info.into(),
        }
    }

    /// JSON text sent as the `payload` form field.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Format `now` as `YYYY-MM-DD HH:MM:SS` at +09:00.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    (now + Duration::hours(SHEET_OFFSET_HOURS))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Local delivery status, surfaced to the learner as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkStatus {
    Sending,
    Sent,
    Failed(String),
}

impl fmt::Display for SinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sending => f.write_str("sending"),
            Self::Sent => f.write_str("sent"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

impl Serialize for SinkStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The last built payload and how its delivery went.
///
/// Kept until it is sent so the learner can resend it later. Every send is
/// tagged with a delivery number; only the outcome of the latest one counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResult {
    pub payload: ResultPayload,
    pub status: SinkStatus,
    delivery: u64,
}

impl PendingResult {
    pub fn new(payload: ResultPayload, delivery: u64) -> Self {
        Self {
            payload,
            status: SinkStatus::Sending,
            delivery,
        }
    }

    pub fn delivery(&self) -> u64 {
        self.delivery
    }

    /// Start sending the same payload again as `delivery`.
    pub fn resend(&mut self, delivery: u64) {
        self.status = SinkStatus::Sending;
        self.delivery = delivery;
    }

    /// Record the outcome of `delivery`. Outcomes of superseded sends are
    /// ignored; returns whether the status changed.
    pub fn finish(&mut self, delivery: u64, status: SinkStatus) -> bool {
        if delivery != self.delivery {
            return false;
        }
        self.status = status;
        true
    }

    pub fn is_sent(&self) -> bool {
        self.status == SinkStatus::Sent
    }

    /// A payload can be resent unless it was delivered or is in flight.
    pub fn can_resend(&self) -> bool {
        matches!(self.status, SinkStatus::Failed(_))
    }
}

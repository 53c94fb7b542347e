//! Widget tracking types — click events, batch envelopes, and analytics
//! beacon payloads exchanged with the tracking backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single CTA-button click captured by the widget.
///
/// The id is assigned by the queue at enqueue time and is the unit of
/// de-duplication in persisted storage. All caller-supplied identifiers are
/// opaque strings; the queue never validates or interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub id: Uuid,
    pub session_id: String,
    pub question_id: String,
    pub offer_id: String,
    pub button_variant_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub retry_count: u32,
}

/// Caller-supplied click fields, before the queue assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct ClickRecord {
    pub session_id: String,
    pub question_id: String,
    pub offer_id: String,
    pub button_variant_id: String,
}

/// A group of click events dispatched and retried as a single unit.
///
/// Batches are ephemeral: only their constituent events are ever persisted,
/// and the envelope is discarded after a terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    pub batch_id: Uuid,
    pub events: Vec<ClickEvent>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl EventBatch {
    /// Wrap a non-empty set of events in a fresh dispatch envelope.
    pub fn new(events: Vec<ClickEvent>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            events,
            timestamp: Utc::now(),
        }
    }

    /// Highest retry count across the batch; the batch retries as a unit,
    /// so this decides whether the retry cap is reached.
    pub fn max_retry_count(&self) -> u32 {
        self.events.iter().map(|e| e.retry_count).max().unwrap_or(0)
    }
}

/// Page-lifecycle analytics event kinds sent outside the click queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BeaconEvent {
    Loaded,
    Dwell,
}

/// One-shot analytics beacon payload (widget load / dwell time).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconPayload {
    pub survey_id: String,
    pub event: BeaconEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dwell_time_ms: Option<u64>,
}

/// Snapshot of the click queue's current state. Read-only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub buffered: usize,
    pub online: bool,
    pub persisted: usize,
}

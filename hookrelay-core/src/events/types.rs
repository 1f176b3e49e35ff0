//! Event type definitions for the dispatch pipeline.
//!
//! Events are ephemeral: they live only inside the jobs that carry them.
//! Jobs hold subscription ids rather than records, and the executor
//! re-reads the registry before every attempt.

use compact_str::CompactString;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::time::Instant;
use url::Url;
use uuid::Uuid;

use crate::entities::OwnerId;

/// A domain event emitted by a producer.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: CompactString,
    pub payload: Value,
    pub emitted_at: OffsetDateTime,
}

impl Event {
    pub fn new(event_type: impl Into<CompactString>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            emitted_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Optional restrictions on `Dispatcher::trigger`.
#[derive(Debug, Clone, Default)]
pub struct TriggerOptions {
    /// Deliver only to these subscriptions (intersected with the matches).
    pub subscription_ids: Option<Vec<Uuid>>,
}

/// One pending delivery of an event to one subscription.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub job_id: Uuid,
    pub subscription_id: Uuid,
    /// Shared by every job fanned out from the same `trigger`.
    pub event: Arc<Event>,
    pub enqueued_at: OffsetDateTime,
    /// Attempts already made.
    pub attempt: u32,
    pub next_attempt_at: Instant,
}

impl DeliveryJob {
    pub fn new(subscription_id: Uuid, event: Arc<Event>) -> Self {
        Self {
            job_id: Uuid::now_v7(),
            subscription_id,
            event,
            enqueued_at: OffsetDateTime::now_utc(),
            attempt: 0,
            next_attempt_at: Instant::now(),
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_attempt_at <= now
    }
}

/// Why a delivery attempt (or a whole job) failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("target responded with HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to serialize envelope: {0}")]
    Serialization(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<DeliveryError>,
    },
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub job_id: Uuid,
    pub subscription_id: Uuid,
    pub success: bool,
    pub http_status: Option<u16>,
    pub error: Option<DeliveryError>,
    /// 1-based.
    pub attempt_number: u32,
    pub completed_at: OffsetDateTime,
}

/// Reported once per job whose attempt budget ran out.
#[derive(Debug, Clone)]
pub struct TerminalFailure {
    pub job_id: Uuid,
    pub subscription_id: Uuid,
    pub owner_id: OwnerId,
    pub target_url: Url,
    pub event_type: CompactString,
    pub error: DeliveryError,
    pub failed_at: OffsetDateTime,
}

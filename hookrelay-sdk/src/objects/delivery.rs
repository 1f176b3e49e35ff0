//! Producer-side and delivery-result bodies.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Body of the internal `POST /internal/trigger` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Restrict delivery to these subscriptions.
    #[serde(default)]
    pub subscription_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub enqueued: usize,
}

/// Body of `POST /webhooks/{id}/replay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRequest {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcomeResponse {
    pub job_id: Uuid,
    pub success: bool,
    pub http_status: Option<u16>,
    pub error: Option<String>,
    pub attempt: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

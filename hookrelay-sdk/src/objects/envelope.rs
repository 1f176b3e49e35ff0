//! The JSON body POSTed to every subscriber.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Delivery envelope.
///
/// Field order is the serialization order and is part of the wire contract:
/// the signature is computed over the exact serialized bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    /// Unique per attempt; mirrored in the `X-Webhook-ID` header.
    pub id: Uuid,
    pub event: CompactString,
    pub data: serde_json::Value,
    /// When the event was emitted.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub webhook: WebhookRef,
}

/// Identifies the subscription a delivery was made for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRef {
    pub id: Uuid,
    pub url: String,
}

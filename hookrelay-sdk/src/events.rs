//! Catalog of event types emitted by the platform.
//!
//! Producers may trigger any non-empty event type; this catalog is what the
//! platform itself emits and what `GET /events` advertises to subscribers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Event types the platform emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "project.created")]
    ProjectCreated,
    #[serde(rename = "project.updated")]
    ProjectUpdated,
    #[serde(rename = "project.deleted")]
    ProjectDeleted,
    #[serde(rename = "project.deployed")]
    ProjectDeployed,
    #[serde(rename = "project.failed")]
    ProjectFailed,
    #[serde(rename = "user.created")]
    UserCreated,
    #[serde(rename = "user.updated")]
    UserUpdated,
    #[serde(rename = "service.created")]
    ServiceCreated,
    #[serde(rename = "service.updated")]
    ServiceUpdated,
    #[serde(rename = "file.uploaded")]
    FileUploaded,
    #[serde(rename = "file.deleted")]
    FileDeleted,
    #[serde(rename = "payment.completed")]
    PaymentCompleted,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "subscription.created")]
    SubscriptionCreated,
    #[serde(rename = "subscription.canceled")]
    SubscriptionCanceled,
    #[serde(rename = "webhook.test")]
    WebhookTest,
    #[serde(rename = "system.maintenance")]
    SystemMaintenance,
    #[serde(rename = "system.error")]
    SystemError,
}

impl EventType {
    /// Every supported event type, in catalog order.
    pub const ALL: [EventType; 18] = [
        EventType::ProjectCreated,
        EventType::ProjectUpdated,
        EventType::ProjectDeleted,
        EventType::ProjectDeployed,
        EventType::ProjectFailed,
        EventType::UserCreated,
        EventType::UserUpdated,
        EventType::ServiceCreated,
        EventType::ServiceUpdated,
        EventType::FileUploaded,
        EventType::FileDeleted,
        EventType::PaymentCompleted,
        EventType::PaymentFailed,
        EventType::SubscriptionCreated,
        EventType::SubscriptionCanceled,
        EventType::WebhookTest,
        EventType::SystemMaintenance,
        EventType::SystemError,
    ];

    /// The dotted wire name, e.g. `project.created`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::ProjectCreated => "project.created",
            EventType::ProjectUpdated => "project.updated",
            EventType::ProjectDeleted => "project.deleted",
            EventType::ProjectDeployed => "project.deployed",
            EventType::ProjectFailed => "project.failed",
            EventType::UserCreated => "user.created",
            EventType::UserUpdated => "user.updated",
            EventType::ServiceCreated => "service.created",
            EventType::ServiceUpdated => "service.updated",
            EventType::FileUploaded => "file.uploaded",
            EventType::FileDeleted => "file.deleted",
            EventType::PaymentCompleted => "payment.completed",
            EventType::PaymentFailed => "payment.failed",
            EventType::SubscriptionCreated => "subscription.created",
            EventType::SubscriptionCanceled => "subscription.canceled",
            EventType::WebhookTest => "webhook.test",
            EventType::SystemMaintenance => "system.maintenance",
            EventType::SystemError => "system.error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a name that is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_owned()))
    }
}

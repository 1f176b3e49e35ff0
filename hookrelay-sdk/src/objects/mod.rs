//! Request and response bodies exchanged with Hookrelay.

pub mod delivery;
pub mod envelope;
pub mod subscription;

pub use delivery::{DeliveryOutcomeResponse, ReplayRequest, TriggerRequest, TriggerResponse};
pub use envelope::{WebhookEnvelope, WebhookRef};
pub use subscription::{
    CreateWebhookRequest, UpdateWebhookRequest, WebhookCreatedResponse, WebhookResponse,
    WebhookStatsResponse,
};

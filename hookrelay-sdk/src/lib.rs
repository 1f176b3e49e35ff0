//! Shared types for Hookrelay.
//!
//! Receivers of Hookrelay webhooks only need this crate: it defines the
//! delivery envelope, the header names, the event catalog and the
//! HMAC-SHA256 signature check.

#![forbid(unsafe_code)]

pub mod events;
pub mod objects;
pub mod signature;

pub use events::EventType;
pub use objects::envelope::{WebhookEnvelope, WebhookRef};
pub use signature::{SignatureError, sign_body, verify_signature, verify_webhook};

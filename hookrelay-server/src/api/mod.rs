//! HTTP management API.
//!
//! # Endpoints
//!
//! - `GET    /events`                 – supported event catalog
//! - `POST   /webhooks`               – register a webhook (secret returned once)
//! - `GET    /webhooks`               – list the caller's webhooks
//! - `GET    /webhooks/{id}`          – fetch one webhook
//! - `PATCH  /webhooks/{id}`          – partial update
//! - `DELETE /webhooks/{id}`          – delete
//! - `GET    /webhooks/{id}/stats`    – delivery counters
//! - `POST   /webhooks/{id}/test`     – send a `webhook.test` event now
//! - `POST   /webhooks/{id}/replay`   – re-deliver an arbitrary event now
//! - `POST   /internal/trigger`       – producer entry point (admin only)
//!
//! Webhook routes are scoped by the `Hookrelay-Owner-Id` header.

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod error;
mod events;
mod extractors;
mod webhooks;

pub(crate) use error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(events::list_event_types))
        .route(
            "/webhooks",
            post(webhooks::create_webhook).get(webhooks::list_webhooks),
        )
        .route(
            "/webhooks/{id}",
            get(webhooks::get_webhook)
                .patch(webhooks::update_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route("/webhooks/{id}/stats", get(webhooks::get_stats))
        .route("/webhooks/{id}/test", post(webhooks::test_webhook))
        .route("/webhooks/{id}/replay", post(webhooks::replay_webhook))
        .route("/internal/trigger", post(events::trigger_event))
}

#[cfg(test)]
mod tests;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use hookrelay_core::events::TriggerOptions;
use hookrelay_core::processors::Dispatcher;
use hookrelay_sdk::objects::{TriggerRequest, TriggerResponse};

use super::ApiError;
use super::extractors::AdminAuth;
use crate::state::AppState;

/// `GET /events`: event types the platform emits.
pub(super) async fn list_event_types() -> impl IntoResponse {
    Json(Dispatcher::supported_event_types())
}

/// `POST /internal/trigger`: fan an event out to every matching webhook.
///
/// Returns as soon as the jobs are queued.
pub(super) async fn trigger_event(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(body): Json<TriggerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let enqueued = state
        .dispatcher
        .trigger(
            &body.event,
            body.data,
            TriggerOptions {
                subscription_ids: body.subscription_ids,
            },
        )
        .await?;

    tracing::info!(event = %body.event, enqueued, "Event accepted for delivery");
    Ok((StatusCode::ACCEPTED, Json(TriggerResponse { enqueued })))
}

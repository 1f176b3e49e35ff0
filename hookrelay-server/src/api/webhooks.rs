use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use hookrelay_core::entities::delivery_stats::SubscriptionStats;
use hookrelay_core::entities::subscription::{
    CreateSubscription, DeleteSubscription, GetSubscription, ListSubscriptions, Subscription,
    SubscriptionPatch, UpdateSubscription,
};
use hookrelay_core::events::DeliveryOutcome;
use hookrelay_sdk::objects::{
    CreateWebhookRequest, DeliveryOutcomeResponse, ReplayRequest, UpdateWebhookRequest,
    WebhookCreatedResponse, WebhookResponse, WebhookStatsResponse,
};
use kanau::processor::Processor;
use std::time::Duration;
use uuid::Uuid;

use super::ApiError;
use super::extractors::Owner;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn to_response(s: &Subscription) -> WebhookResponse {
    WebhookResponse {
        id: s.id,
        url: s.target_url.to_string(),
        events: s.patterns.to_strings(),
        active: s.active,
        max_attempts: s.max_attempts,
        timeout_secs: s.attempt_timeout.as_secs(),
        created_at: s.created_at,
        updated_at: s.updated_at,
        last_triggered_at: s.last_triggered_at,
    }
}

fn to_stats_response(stats: SubscriptionStats) -> WebhookStatsResponse {
    let s = &stats.subscription;
    WebhookStatsResponse {
        id: s.id,
        url: s.target_url.to_string(),
        events: s.patterns.to_strings(),
        active: s.active,
        created_at: s.created_at,
        updated_at: s.updated_at,
        last_triggered_at: stats.last_triggered_at,
        success_count: stats.success_count,
        failure_count: stats.failure_count,
        success_rate: stats.success_rate,
    }
}

fn to_outcome_response(outcome: &DeliveryOutcome) -> DeliveryOutcomeResponse {
    DeliveryOutcomeResponse {
        job_id: outcome.job_id,
        success: outcome.success,
        http_status: outcome.http_status,
        error: outcome.error.as_ref().map(ToString::to_string),
        attempt: outcome.attempt_number,
        completed_at: outcome.completed_at,
    }
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// `POST /webhooks`: register a webhook. The secret is only ever returned here.
pub(super) async fn create_webhook(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Json(body): Json<CreateWebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = state.delivery.current();

    let subscription = state
        .registry()
        .process(CreateSubscription {
            owner_id,
            url: body.url,
            events: body.events,
            secret: body.secret,
            active: body.active,
            max_attempts: Some(body.max_attempts.unwrap_or(defaults.default_max_attempts)),
            attempt_timeout: Some(
                body.timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.default_attempt_timeout),
            ),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(WebhookCreatedResponse {
            webhook: to_response(&subscription),
            secret: subscription.secret.expose().to_string(),
        }),
    ))
}

/// `GET /webhooks`
pub(super) async fn list_webhooks(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
) -> impl IntoResponse {
    let Ok(subscriptions) = state
        .registry()
        .process(ListSubscriptions { owner_id })
        .await;
    Json(subscriptions.iter().map(to_response).collect::<Vec<_>>())
}

/// `GET /webhooks/{id}`
pub(super) async fn get_webhook(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = state
        .registry()
        .process(GetSubscription { id, owner_id })
        .await?;
    Ok(Json(to_response(&subscription)))
}

/// `PATCH /webhooks/{id}`
pub(super) async fn update_webhook(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateWebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = state
        .registry()
        .process(UpdateSubscription {
            id,
            owner_id,
            patch: SubscriptionPatch {
                url: body.url,
                events: body.events,
                secret: body.secret,
                active: body.active,
                max_attempts: body.max_attempts,
                attempt_timeout: body.timeout_secs.map(Duration::from_secs),
            },
        })
        .await?;
    Ok(Json(to_response(&subscription)))
}

/// `DELETE /webhooks/{id}`
pub(super) async fn delete_webhook(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .registry()
        .process(DeleteSubscription { id, owner_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Stats / test / replay
// ---------------------------------------------------------------------------

/// `GET /webhooks/{id}/stats`
pub(super) async fn get_stats(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.dispatcher.stats(id, owner_id).await?;
    Ok(Json(to_stats_response(stats)))
}

/// `POST /webhooks/{id}/test`: deliver a `webhook.test` event and wait for
/// the first attempt.
pub(super) async fn test_webhook(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.dispatcher.test_subscription(id, owner_id).await?;
    Ok(Json(to_outcome_response(&outcome)))
}

/// `POST /webhooks/{id}/replay`
pub(super) async fn replay_webhook(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(id): Path<Uuid>,
    Json(body): Json<ReplayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .dispatcher
        .replay(id, owner_id, &body.event, body.data)
        .await?;
    Ok(Json(to_outcome_response(&outcome)))
}

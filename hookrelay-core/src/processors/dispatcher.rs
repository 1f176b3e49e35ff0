//! Dispatcher.
//!
//! The producer-facing handle of the engine. It matches events against the
//! registry and feeds the resulting jobs to the [`DeliveryWorker`]; it also
//! runs the inline test and replay deliveries.

use crate::entities::OwnerId;
use crate::entities::delivery_stats::{GetSubscriptionStats, SubscriptionStats};
use crate::entities::subscription::{GetSubscription, RegistryError, SelectSubscriptions};
use crate::events::{
    DeliveryJob, DeliveryJobSender, DeliveryOutcome, Event, TriggerOptions, delivery_job_channel,
};
use crate::framework::SubscriptionRegistry;
use crate::processors::delivery_worker::DeliveryWorker;
use crate::processors::executor::DeliveryExecutor;
use crate::processors::retry::{FailureNotifier, RetryController};
use crate::transport::DeliveryTransport;
use hookrelay_sdk::EventType;
use kanau::processor::Processor;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const TEST_MESSAGE: &str = "This is a test webhook from Hookrelay";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("delivery worker is not running")]
    Unavailable,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: SubscriptionRegistry,
    jobs_tx: DeliveryJobSender,
    executor: DeliveryExecutor,
    retry: RetryController,
}

impl Dispatcher {
    /// Create a dispatcher and the one worker that serves it.
    ///
    /// The worker does nothing until [`DeliveryWorker::run`] is spawned.
    pub fn new(
        registry: SubscriptionRegistry,
        transport: Arc<dyn DeliveryTransport>,
        notifier: Arc<dyn FailureNotifier>,
    ) -> (Self, DeliveryWorker) {
        let (jobs_tx, jobs_rx) = delivery_job_channel();
        let executor = DeliveryExecutor::new(registry.clone(), transport);
        let retry = RetryController::new(notifier);
        let worker = DeliveryWorker::new(jobs_rx, executor.clone(), retry.clone());
        (
            Self {
                registry,
                jobs_tx,
                executor,
                retry,
            },
            worker,
        )
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Enqueue one job per active matching subscription.
    ///
    /// Returns the number of jobs enqueued. Never waits for delivery.
    pub async fn trigger(
        &self,
        event_type: &str,
        payload: Value,
        options: TriggerOptions,
    ) -> Result<usize, DispatchError> {
        if event_type.trim().is_empty() {
            return Err(DispatchError::InvalidArgument("event type must not be empty"));
        }
        if self.jobs_tx.is_closed() {
            return Err(DispatchError::Unavailable);
        }

        let Ok(targets) = self
            .registry
            .process(SelectSubscriptions {
                event_type: event_type.to_string(),
                only: options.subscription_ids,
            })
            .await;

        let event = Arc::new(Event::new(event_type, payload));
        for subscription in &targets {
            let job = DeliveryJob::new(subscription.id, Arc::clone(&event));
            self.jobs_tx
                .send(job)
                .map_err(|_| DispatchError::Unavailable)?;
        }

        debug!(event = %event_type, enqueued = targets.len(), "Event triggered");
        Ok(targets.len())
    }

    /// Deliver a fixed `webhook.test` event to one subscription, inline.
    ///
    /// Ignores the subscription's patterns and active flag.
    pub async fn test_subscription(
        &self,
        id: Uuid,
        owner_id: OwnerId,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let now = OffsetDateTime::now_utc();
        let payload = json!({
            "type": "test",
            "message": TEST_MESSAGE,
            "timestamp": now.format(&Rfc3339).unwrap_or_default(),
        });
        self.deliver_inline(id, owner_id, EventType::WebhookTest.as_str(), payload)
            .await
    }

    /// Re-deliver an arbitrary event to one subscription with a fresh
    /// attempt budget.
    pub async fn replay(
        &self,
        id: Uuid,
        owner_id: OwnerId,
        event_type: &str,
        payload: Value,
    ) -> Result<DeliveryOutcome, DispatchError> {
        if event_type.trim().is_empty() {
            return Err(DispatchError::InvalidArgument("event type must not be empty"));
        }
        self.deliver_inline(id, owner_id, event_type, payload).await
    }

    async fn deliver_inline(
        &self,
        id: Uuid,
        owner_id: OwnerId,
        event_type: &str,
        payload: Value,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let subscription = self
            .registry
            .process(GetSubscription { id, owner_id })
            .await?;

        let job = DeliveryJob::new(subscription.id, Arc::new(Event::new(event_type, payload)));
        let report = self
            .executor
            .execute(&job)
            .await
            .ok_or(RegistryError::NotFoundOrForbidden)?;

        if report.outcome.success {
            return Ok(report.outcome);
        }
        if let Some(retry) = self
            .retry
            .handle_failure(job, &report.subscription, &report.outcome)
            .await
        {
            if self.jobs_tx.send(retry).is_err() {
                warn!(
                    subscription_id = %id,
                    "Delivery worker gone, follow-up attempts dropped"
                );
            } else {
                info!(subscription_id = %id, "Inline delivery failed, retry handed to worker");
            }
        }

        Ok(report.outcome)
    }

    pub async fn stats(
        &self,
        id: Uuid,
        owner_id: OwnerId,
    ) -> Result<SubscriptionStats, DispatchError> {
        Ok(self
            .registry
            .process(GetSubscriptionStats { id, owner_id })
            .await?)
    }

    pub fn supported_event_types() -> &'static [EventType] {
        &EventType::ALL
    }
}

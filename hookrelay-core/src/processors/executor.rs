//! DeliveryExecutor.
//!
//! Performs exactly one attempt of a job:
//! - re-reads the subscription (deleted subscriptions drop the attempt)
//! - builds and signs the envelope
//! - POSTs it through the transport, racing the subscription's timeout
//! - records the result on the subscription counters

use crate::entities::delivery_stats::RecordDeliveryResult;
use crate::entities::subscription::{FindSubscription, Subscription};
use crate::events::{DeliveryError, DeliveryJob, DeliveryOutcome};
use crate::framework::SubscriptionRegistry;
use crate::transport::{DeliveryRequest, DeliveryTransport, TransportError};
use bytes::Bytes;
use hookrelay_sdk::signature::{
    EVENT_TYPE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, WEBHOOK_ID_HEADER,
    format_signature_header, sign_body,
};
use hookrelay_sdk::{WebhookEnvelope, WebhookRef};
use kanau::processor::Processor;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An attempt's outcome together with the subscription it was made for.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub outcome: DeliveryOutcome,
    pub subscription: Subscription,
}

#[derive(Clone)]
pub struct DeliveryExecutor {
    registry: SubscriptionRegistry,
    transport: Arc<dyn DeliveryTransport>,
}

impl DeliveryExecutor {
    pub fn new(registry: SubscriptionRegistry, transport: Arc<dyn DeliveryTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Attempt `job` once.
    ///
    /// Returns `None` when the subscription no longer exists; nothing is
    /// sent or recorded in that case.
    pub async fn execute(&self, job: &DeliveryJob) -> Option<AttemptReport> {
        let Ok(found) = self
            .registry
            .process(FindSubscription {
                id: job.subscription_id,
            })
            .await;
        let Some(subscription) = found else {
            debug!(
                job_id = %job.job_id,
                subscription_id = %job.subscription_id,
                "Subscription deleted, dropping delivery"
            );
            return None;
        };

        let attempt_number = job.attempt + 1;
        let result = self.deliver(job, &subscription).await;
        let completed_at = OffsetDateTime::now_utc();

        let outcome = match result {
            Ok(status) => {
                info!(
                    job_id = %job.job_id,
                    subscription_id = %subscription.id,
                    event = %job.event.event_type,
                    attempt = attempt_number,
                    status,
                    "Webhook delivered"
                );
                DeliveryOutcome {
                    job_id: job.job_id,
                    subscription_id: subscription.id,
                    success: true,
                    http_status: Some(status),
                    error: None,
                    attempt_number,
                    completed_at,
                }
            }
            Err(error) => {
                warn!(
                    job_id = %job.job_id,
                    subscription_id = %subscription.id,
                    event = %job.event.event_type,
                    attempt = attempt_number,
                    max_attempts = subscription.max_attempts,
                    error = %error,
                    "Webhook delivery failed"
                );
                let http_status = match &error {
                    DeliveryError::HttpStatus { status } => Some(*status),
                    _ => None,
                };
                DeliveryOutcome {
                    job_id: job.job_id,
                    subscription_id: subscription.id,
                    success: false,
                    http_status,
                    error: Some(error),
                    attempt_number,
                    completed_at,
                }
            }
        };

        let Ok(still_registered) = self
            .registry
            .process(RecordDeliveryResult {
                subscription_id: subscription.id,
                success: outcome.success,
                completed_at,
            })
            .await;
        if !still_registered {
            debug!(
                subscription_id = %subscription.id,
                "Subscription deleted during delivery, counters not recorded"
            );
        }

        Some(AttemptReport {
            outcome,
            subscription,
        })
    }

    /// Build, sign and send the envelope. Returns the 2xx status on success.
    async fn deliver(
        &self,
        job: &DeliveryJob,
        subscription: &Subscription,
    ) -> Result<u16, DeliveryError> {
        let request = build_request(job, subscription)?;
        let timeout = request.timeout;

        let sent = tokio::time::timeout(timeout, self.transport.send(request)).await;
        match sent {
            Err(_elapsed) => Err(DeliveryError::Timeout(timeout)),
            Ok(Err(TransportError::Timeout)) => Err(DeliveryError::Timeout(timeout)),
            Ok(Err(TransportError::Network(message))) => Err(DeliveryError::Network(message)),
            Ok(Ok(status)) if (200..300).contains(&status) => Ok(status),
            Ok(Ok(status)) => Err(DeliveryError::HttpStatus { status }),
        }
    }
}

/// Serialize the envelope for `job` and attach the delivery headers.
pub fn build_request(
    job: &DeliveryJob,
    subscription: &Subscription,
) -> Result<DeliveryRequest, DeliveryError> {
    let envelope = WebhookEnvelope {
        id: Uuid::new_v4(),
        event: job.event.event_type.clone(),
        data: job.event.payload.clone(),
        timestamp: job.event.emitted_at,
        webhook: WebhookRef {
            id: subscription.id,
            url: subscription.target_url.to_string(),
        },
    };

    let body = serde_json::to_vec(&envelope)
        .map_err(|e| DeliveryError::Serialization(e.to_string()))?;
    let timestamp = envelope
        .timestamp
        .format(&Rfc3339)
        .map_err(|e| DeliveryError::Serialization(e.to_string()))?;
    let signature = sign_body(&body, subscription.secret.as_bytes());

    Ok(DeliveryRequest {
        url: subscription.target_url.clone(),
        headers: vec![
            ("Content-Type", "application/json".to_string()),
            (WEBHOOK_ID_HEADER, envelope.id.to_string()),
            (EVENT_TYPE_HEADER, envelope.event.to_string()),
            (TIMESTAMP_HEADER, timestamp),
            (SIGNATURE_HEADER, format_signature_header(&signature)),
        ],
        body: Bytes::from(body),
        timeout: subscription.attempt_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::subscription::{CreateSubscription, DeleteSubscription};
    use crate::events::Event;
    use async_trait::async_trait;
    use hookrelay_sdk::verify_webhook;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies with a fixed result and keeps every request.
    struct FixedTransport {
        reply: Result<u16, TransportError>,
        requests: Mutex<Vec<DeliveryRequest>>,
    }

    impl FixedTransport {
        fn new(reply: Result<u16, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DeliveryTransport for FixedTransport {
        async fn send(&self, request: DeliveryRequest) -> Result<u16, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    /// Never answers.
    struct HangingTransport;

    #[async_trait]
    impl DeliveryTransport for HangingTransport {
        async fn send(&self, _request: DeliveryRequest) -> Result<u16, TransportError> {
            std::future::pending().await
        }
    }

    async fn setup(
        transport: Arc<dyn DeliveryTransport>,
    ) -> (SubscriptionRegistry, DeliveryExecutor, Subscription) {
        let registry = SubscriptionRegistry::new();
        let mut create = CreateSubscription::new(
            "alice",
            "https://example.test/hook",
            vec!["project.created".to_string()],
        );
        create.secret = Some("topsecret".to_string());
        create.attempt_timeout = Some(Duration::from_secs(5));
        let sub = registry.process(create).await.unwrap();
        let executor = DeliveryExecutor::new(registry.clone(), transport);
        (registry, executor, sub)
    }

    fn job_for(sub: &Subscription) -> DeliveryJob {
        DeliveryJob::new(
            sub.id,
            Arc::new(Event::new("project.created", serde_json::json!({"name": "demo"}))),
        )
    }

    #[tokio::test]
    async fn test_success_records_and_signs() {
        let transport = FixedTransport::new(Ok(204));
        let (registry, executor, sub) = setup(transport.clone()).await;
        let job = job_for(&sub);

        let report = executor.execute(&job).await.unwrap();
        assert!(report.outcome.success);
        assert_eq!(report.outcome.http_status, Some(204));
        assert_eq!(report.outcome.attempt_number, 1);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url.as_str(), "https://example.test/hook");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("X-Event-Type"), Some("project.created"));
        assert_eq!(request.timeout, Duration::from_secs(5));

        let envelope = verify_webhook(
            request.header("X-Signature").unwrap(),
            &request.body,
            b"topsecret",
        )
        .unwrap();
        assert_eq!(envelope.event, "project.created");
        assert_eq!(envelope.data["name"], "demo");
        assert_eq!(envelope.webhook.id, sub.id);
        assert_eq!(envelope.timestamp, job.event.emitted_at);
        assert_eq!(request.header("X-Webhook-ID"), Some(envelope.id.to_string().as_str()));
        drop(requests);

        let current = registry.process(FindSubscription { id: sub.id }).await.unwrap().unwrap();
        assert_eq!(current.success_count, 1);
        assert_eq!(current.failure_count, 0);
        assert_eq!(current.last_triggered_at, Some(report.outcome.completed_at));
    }

    #[tokio::test]
    async fn test_non_2xx_is_failure() {
        let (registry, executor, sub) = setup(FixedTransport::new(Ok(500))).await;
        let report = executor.execute(&job_for(&sub)).await.unwrap();
        assert!(!report.outcome.success);
        assert_eq!(report.outcome.http_status, Some(500));
        assert_eq!(
            report.outcome.error,
            Some(DeliveryError::HttpStatus { status: 500 })
        );

        let current = registry.process(FindSubscription { id: sub.id }).await.unwrap().unwrap();
        assert_eq!((current.success_count, current.failure_count), (0, 1));
        assert!(current.last_triggered_at.is_none());
    }

    #[tokio::test]
    async fn test_redirect_status_is_failure() {
        let (_registry, executor, sub) = setup(FixedTransport::new(Ok(302))).await;
        let report = executor.execute(&job_for(&sub)).await.unwrap();
        assert!(!report.outcome.success);
    }

    #[tokio::test]
    async fn test_network_error_is_failure() {
        let transport = FixedTransport::new(Err(TransportError::Network("refused".into())));
        let (_registry, executor, sub) = setup(transport).await;
        let report = executor.execute(&job_for(&sub)).await.unwrap();
        assert_eq!(
            report.outcome.error,
            Some(DeliveryError::Network("refused".into()))
        );
        assert_eq!(report.outcome.http_status, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_is_cut_at_timeout() {
        let (_registry, executor, sub) = setup(Arc::new(HangingTransport)).await;
        let started = tokio::time::Instant::now();
        let report = executor.execute(&job_for(&sub)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(
            report.outcome.error,
            Some(DeliveryError::Timeout(Duration::from_secs(5)))
        );
    }

    #[tokio::test]
    async fn test_deleted_subscription_is_dropped() {
        let transport = FixedTransport::new(Ok(200));
        let (registry, executor, sub) = setup(transport.clone()).await;
        registry
            .process(DeleteSubscription { id: sub.id, owner_id: "alice".into() })
            .await
            .unwrap();

        assert!(executor.execute(&job_for(&sub)).await.is_none());
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_envelope_id_is_fresh_per_attempt() {
        let transport = FixedTransport::new(Ok(500));
        let (_registry, executor, sub) = setup(transport.clone()).await;
        let mut job = job_for(&sub);
        executor.execute(&job).await.unwrap();
        job.attempt = 1;
        let report = executor.execute(&job).await.unwrap();
        assert_eq!(report.outcome.attempt_number, 2);

        let requests = transport.requests.lock().unwrap();
        assert_ne!(
            requests[0].header("X-Webhook-ID"),
            requests[1].header("X-Webhook-ID")
        );
    }
}

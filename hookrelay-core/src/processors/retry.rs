//! RetryController.
//!
//! Decides what happens after a failed attempt: reschedule with
//! exponential backoff, or finalize the job and report it.

use crate::entities::subscription::Subscription;
use crate::events::{DeliveryError, DeliveryJob, DeliveryOutcome, TerminalFailure};
use crate::utils::backoff::retry_delay;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::time::Instant;
use tracing::{debug, error};

/// Receives jobs whose attempt budget is exhausted.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify(&self, failure: TerminalFailure);
}

/// Default notifier: one structured error log line per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFailureNotifier;

#[async_trait]
impl FailureNotifier for LogFailureNotifier {
    async fn notify(&self, failure: TerminalFailure) {
        let timestamp = failure.failed_at.format(&Rfc3339).unwrap_or_default();
        error!(
            subscription_id = %failure.subscription_id,
            owner_id = %failure.owner_id,
            url = %failure.target_url,
            event = %failure.event_type,
            error = %failure.error,
            timestamp = %timestamp,
            "Webhook delivery permanently failed"
        );
    }
}

/// Delay before the next attempt, or `None` when `attempt_number` was the
/// last one allowed.
pub fn next_retry_delay(attempt_number: u32, max_attempts: u32) -> Option<Duration> {
    (attempt_number < max_attempts).then(|| retry_delay(attempt_number))
}

#[derive(Clone)]
pub struct RetryController {
    notifier: Arc<dyn FailureNotifier>,
}

impl RetryController {
    pub fn new(notifier: Arc<dyn FailureNotifier>) -> Self {
        Self { notifier }
    }

    /// Handle a failed attempt of `job`.
    ///
    /// Returns the rescheduled job, or `None` after reporting a terminal
    /// failure.
    pub async fn handle_failure(
        &self,
        mut job: DeliveryJob,
        subscription: &Subscription,
        outcome: &DeliveryOutcome,
    ) -> Option<DeliveryJob> {
        let attempt_number = outcome.attempt_number;
        if let Some(delay) = next_retry_delay(attempt_number, subscription.max_attempts) {
            job.attempt = attempt_number;
            job.next_attempt_at = Instant::now() + delay;
            debug!(
                job_id = %job.job_id,
                subscription_id = %job.subscription_id,
                attempt = attempt_number,
                delay_secs = delay.as_secs(),
                "Scheduling webhook retry"
            );
            return Some(job);
        }

        let last = outcome
            .error
            .clone()
            .unwrap_or(DeliveryError::Network("unknown failure".to_string()));
        self.notifier
            .notify(TerminalFailure {
                job_id: job.job_id,
                subscription_id: subscription.id,
                owner_id: subscription.owner_id.clone(),
                target_url: subscription.target_url.clone(),
                event_type: job.event.event_type.clone(),
                error: DeliveryError::RetriesExhausted {
                    attempts: attempt_number,
                    last: Box::new(last),
                },
                failed_at: OffsetDateTime::now_utc(),
            })
            .await;
        None
    }
}

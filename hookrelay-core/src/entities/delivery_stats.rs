use crate::entities::OwnerId;
use crate::entities::subscription::{RegistryError, Subscription};
use crate::framework::SubscriptionRegistry;
use kanau::processor::Processor;
use std::convert::Infallible;
use time::OffsetDateTime;
use uuid::Uuid;

/// Apply one attempt's result to the subscription counters.
///
/// Output is `false` when the subscription no longer exists.
#[derive(Debug, Clone, Copy)]
pub struct RecordDeliveryResult {
    pub subscription_id: Uuid,
    pub success: bool,
    pub completed_at: OffsetDateTime,
}

impl Processor<RecordDeliveryResult> for SubscriptionRegistry {
    type Output = bool;
    type Error = Infallible;
    async fn process(&self, input: RecordDeliveryResult) -> Result<bool, Infallible> {
        let mut state = self.write().await;
        let Some(record) = state.records.get_mut(&input.subscription_id) else {
            return Ok(false);
        };
        if input.success {
            record.success_count = record.success_count.saturating_add(1);
            record.last_triggered_at = Some(input.completed_at);
        } else {
            record.failure_count = record.failure_count.saturating_add(1);
        }
        Ok(true)
    }
}

/// Counters and derived rate of one subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionStats {
    pub subscription: Subscription,
    pub success_count: u64,
    pub failure_count: u64,
    /// Percentage in `0.0..=100.0`.
    pub success_rate: f64,
    pub last_triggered_at: Option<OffsetDateTime>,
}

impl SubscriptionStats {
    fn from_subscription(subscription: Subscription) -> Self {
        let success_count = subscription.success_count;
        let failure_count = subscription.failure_count;
        let last_triggered_at = subscription.last_triggered_at;
        Self {
            subscription,
            success_count,
            failure_count,
            success_rate: success_rate(success_count, failure_count),
            last_triggered_at,
        }
    }
}

pub fn success_rate(success_count: u64, failure_count: u64) -> f64 {
    let total = success_count + failure_count;
    if total == 0 {
        return 0.0;
    }
    success_count as f64 / total as f64 * 100.0
}

#[derive(Debug, Clone)]
pub struct GetSubscriptionStats {
    pub id: Uuid,
    pub owner_id: OwnerId,
}

impl Processor<GetSubscriptionStats> for SubscriptionRegistry {
    type Output = SubscriptionStats;
    type Error = RegistryError;
    #[tracing::instrument(skip_all, err, name = "Registry:GetSubscriptionStats", fields(subscription_id = %input.id))]
    async fn process(&self, input: GetSubscriptionStats) -> Result<SubscriptionStats, RegistryError> {
        let state = self.read().await;
        let record = state
            .records
            .get(&input.id)
            .filter(|r| r.owner_id == input.owner_id)
            .ok_or(RegistryError::NotFoundOrForbidden)?;
        Ok(SubscriptionStats::from_subscription(record.clone()))
    }
}

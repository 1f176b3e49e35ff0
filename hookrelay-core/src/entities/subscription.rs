use crate::config::{DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS};
use crate::entities::OwnerId;
use crate::framework::SubscriptionRegistry;
use crate::utils::event_pattern::{EventPatternSet, PatternError};
use kanau::processor::Processor;
use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

/// Errors surfaced synchronously by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid webhook url: {0}")]
    InvalidUrl(String),

    #[error("invalid event pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Unknown id and owner mismatch are deliberately indistinguishable.
    #[error("webhook not found or access denied")]
    NotFoundOrForbidden,
}

/// HMAC key shared with the subscriber.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// 32 random bytes, hex encoded.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Use the caller's secret, or generate one when it is absent or blank.
    fn provided_or_generated(secret: Option<String>) -> Self {
        match secret {
            Some(s) if !s.is_empty() => Self(s),
            _ => Self::generate(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}

/// A registered webhook target.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub target_url: Url,
    pub patterns: EventPatternSet,
    pub secret: SigningSecret,
    pub active: bool,
    /// Total attempts per delivery, first try included.
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_triggered_at: Option<OffsetDateTime>,
    pub success_count: u64,
    pub failure_count: u64,
}

impl Subscription {
    pub fn matches(&self, event_type: &str) -> bool {
        self.active && self.patterns.matches(event_type)
    }
}

/// Parse and check a target URL: absolute, http(s), with a host.
pub fn validate_url(raw: &str) -> Result<Url, RegistryError> {
    let url = Url::parse(raw).map_err(|e| RegistryError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RegistryError::InvalidUrl(format!(
            "{raw}: scheme must be http or https"
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(RegistryError::InvalidUrl(format!("{raw}: missing host")));
    }
    Ok(url)
}

fn validate_max_attempts(max_attempts: u32) -> Result<u32, RegistryError> {
    if max_attempts == 0 {
        return Err(RegistryError::InvalidArgument("max_attempts must be at least 1"));
    }
    Ok(max_attempts)
}

fn validate_replacement_secret(secret: String) -> Result<SigningSecret, RegistryError> {
    if secret.trim().is_empty() {
        return Err(RegistryError::InvalidArgument("secret must not be blank"));
    }
    Ok(SigningSecret(secret))
}

fn validate_timeout(timeout: Duration) -> Result<Duration, RegistryError> {
    if timeout.is_zero() {
        return Err(RegistryError::InvalidArgument("attempt timeout must be positive"));
    }
    Ok(timeout)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub owner_id: OwnerId,
    pub url: String,
    pub events: Vec<String>,
    pub secret: Option<String>,
    pub active: Option<bool>,
    pub max_attempts: Option<u32>,
    pub attempt_timeout: Option<Duration>,
}

impl CreateSubscription {
    pub fn new(owner_id: impl Into<OwnerId>, url: impl Into<String>, events: Vec<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            url: url.into(),
            events,
            secret: None,
            active: None,
            max_attempts: None,
            attempt_timeout: None,
        }
    }
}

impl Processor<CreateSubscription> for SubscriptionRegistry {
    type Output = Subscription;
    type Error = RegistryError;
    #[tracing::instrument(skip_all, err, name = "Registry:CreateSubscription")]
    async fn process(&self, input: CreateSubscription) -> Result<Subscription, RegistryError> {
        let target_url = validate_url(&input.url)?;
        let patterns = EventPatternSet::compile(&input.events)?;
        let max_attempts = validate_max_attempts(input.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS))?;
        let attempt_timeout =
            validate_timeout(input.attempt_timeout.unwrap_or(DEFAULT_ATTEMPT_TIMEOUT))?;

        let now = OffsetDateTime::now_utc();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            target_url,
            patterns,
            secret: SigningSecret::provided_or_generated(input.secret),
            active: input.active.unwrap_or(true),
            max_attempts,
            attempt_timeout,
            created_at: now,
            updated_at: now,
            last_triggered_at: None,
            success_count: 0,
            failure_count: 0,
        };

        let mut state = self.write().await;
        state.order.push(subscription.id);
        state.records.insert(subscription.id, subscription.clone());
        drop(state);

        tracing::info!(
            subscription_id = %subscription.id,
            owner_id = %subscription.owner_id,
            url = %subscription.target_url,
            "Webhook subscription created"
        );
        Ok(subscription)
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Fields an owner may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub secret: Option<String>,
    pub active: Option<bool>,
    pub max_attempts: Option<u32>,
    pub attempt_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct UpdateSubscription {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub patch: SubscriptionPatch,
}

impl Processor<UpdateSubscription> for SubscriptionRegistry {
    type Output = Subscription;
    type Error = RegistryError;
    #[tracing::instrument(skip_all, err, name = "Registry:UpdateSubscription", fields(subscription_id = %input.id))]
    async fn process(&self, input: UpdateSubscription) -> Result<Subscription, RegistryError> {
        let UpdateSubscription {
            id,
            owner_id,
            patch,
        } = input;

        // Validate everything before touching the record so a bad patch
        // leaves it unchanged.
        let target_url = patch.url.as_deref().map(validate_url).transpose()?;
        let patterns = patch
            .events
            .as_deref()
            .map(EventPatternSet::compile)
            .transpose()?;
        let max_attempts = patch.max_attempts.map(validate_max_attempts).transpose()?;
        let attempt_timeout = patch.attempt_timeout.map(validate_timeout).transpose()?;
        // The update response never carries the secret, so a replacement
        // has to come from the owner.
        let secret = patch.secret.map(validate_replacement_secret).transpose()?;

        let mut state = self.write().await;
        let record = state
            .records
            .get_mut(&id)
            .filter(|r| r.owner_id == owner_id)
            .ok_or(RegistryError::NotFoundOrForbidden)?;

        if let Some(url) = target_url {
            record.target_url = url;
        }
        if let Some(patterns) = patterns {
            record.patterns = patterns;
        }
        if let Some(secret) = secret {
            record.secret = secret;
        }
        if let Some(active) = patch.active {
            record.active = active;
        }
        if let Some(max_attempts) = max_attempts {
            record.max_attempts = max_attempts;
        }
        if let Some(timeout) = attempt_timeout {
            record.attempt_timeout = timeout;
        }
        record.updated_at = OffsetDateTime::now_utc();

        Ok(record.clone())
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeleteSubscription {
    pub id: Uuid,
    pub owner_id: OwnerId,
}

impl Processor<DeleteSubscription> for SubscriptionRegistry {
    type Output = bool;
    type Error = RegistryError;
    #[tracing::instrument(skip_all, err, name = "Registry:DeleteSubscription", fields(subscription_id = %input.id))]
    async fn process(&self, input: DeleteSubscription) -> Result<bool, RegistryError> {
        let mut state = self.write().await;
        let owned = state
            .records
            .get(&input.id)
            .is_some_and(|r| r.owner_id == input.owner_id);
        if !owned {
            return Err(RegistryError::NotFoundOrForbidden);
        }
        state.records.remove(&input.id);
        state.order.retain(|id| *id != input.id);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Owner-scoped single lookup.
#[derive(Debug, Clone)]
pub struct GetSubscription {
    pub id: Uuid,
    pub owner_id: OwnerId,
}

impl Processor<GetSubscription> for SubscriptionRegistry {
    type Output = Subscription;
    type Error = RegistryError;
    async fn process(&self, input: GetSubscription) -> Result<Subscription, RegistryError> {
        self.read()
            .await
            .records
            .get(&input.id)
            .filter(|r| r.owner_id == input.owner_id)
            .cloned()
            .ok_or(RegistryError::NotFoundOrForbidden)
    }
}

/// All subscriptions of one owner, in creation order.
#[derive(Debug, Clone)]
pub struct ListSubscriptions {
    pub owner_id: OwnerId,
}

impl Processor<ListSubscriptions> for SubscriptionRegistry {
    type Output = Vec<Subscription>;
    type Error = Infallible;
    async fn process(&self, input: ListSubscriptions) -> Result<Vec<Subscription>, Infallible> {
        Ok(self
            .read()
            .await
            .in_creation_order()
            .filter(|r| r.owner_id == input.owner_id)
            .cloned()
            .collect())
    }
}

/// Unscoped lookup used by the delivery path. `None` once deleted.
#[derive(Debug, Clone, Copy)]
pub struct FindSubscription {
    pub id: Uuid,
}

impl Processor<FindSubscription> for SubscriptionRegistry {
    type Output = Option<Subscription>;
    type Error = Infallible;
    async fn process(&self, input: FindSubscription) -> Result<Option<Subscription>, Infallible> {
        Ok(self.read().await.records.get(&input.id).cloned())
    }
}

/// Active subscriptions of every owner whose patterns match `event_type`,
/// in creation order, optionally restricted to `only`.
#[derive(Debug, Clone)]
pub struct SelectSubscriptions {
    pub event_type: String,
    pub only: Option<Vec<Uuid>>,
}

impl Processor<SelectSubscriptions> for SubscriptionRegistry {
    type Output = Vec<Subscription>;
    type Error = Infallible;
    async fn process(&self, input: SelectSubscriptions) -> Result<Vec<Subscription>, Infallible> {
        let state = self.read().await;
        Ok(state
            .in_creation_order()
            .filter(|r| input.only.as_ref().is_none_or(|ids| ids.contains(&r.id)))
            .filter(|r| r.matches(&input.event_type))
            .cloned()
            .collect())
    }
}

use std::time::Duration;

/// Attempts per delivery when a subscription does not say otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Per-attempt deadline when a subscription does not say otherwise.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_USER_AGENT: &str = concat!("Hookrelay-Webhook/", env!("CARGO_PKG_VERSION"));

/// Delivery defaults applied to new subscriptions, plus the client identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub default_max_attempts: u32,
    pub default_attempt_timeout: Duration,
    pub user_agent: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
            default_attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

//! Application state shared across all request handlers.

use crate::config::runtime::{AdminConfig, DeliveryConfig};
use hookrelay_core::config::ConfigStore;
use hookrelay_core::framework::SubscriptionRegistry;
use hookrelay_core::processors::Dispatcher;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cheap to clone; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    /// Defaults for new subscriptions (swapped on SIGHUP).
    pub delivery: ConfigStore<DeliveryConfig>,
    /// Admin credentials (swapped on SIGHUP).
    pub admin: Arc<RwLock<AdminConfig>>,
}

impl AppState {
    pub fn new(
        dispatcher: Dispatcher,
        delivery: ConfigStore<DeliveryConfig>,
        admin: AdminConfig,
    ) -> Self {
        Self {
            dispatcher,
            delivery,
            admin: Arc::new(RwLock::new(admin)),
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        self.dispatcher.registry()
    }
}

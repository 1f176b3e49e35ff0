//! The in-process subscription store.
//!
//! `SubscriptionRegistry` plays the role a connection pool plays for a
//! database-backed service: it is constructed once, cloned into every
//! component that needs it, and all reads and writes go through the
//! `Processor` impls in [`crate::entities`].

use crate::entities::subscription::Subscription;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    pub(crate) records: HashMap<Uuid, Subscription>,
    /// Ids in creation order.
    pub(crate) order: Vec<Uuid>,
}

impl RegistryState {
    pub(crate) fn in_creation_order(&self) -> impl Iterator<Item = &Subscription> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }
}

/// Shared handle to the subscription store.
///
/// Cloning is cheap. A single lock serializes every mutation, including the
/// counter updates made by the delivery executor.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().await
    }
}

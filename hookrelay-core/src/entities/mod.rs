//! Records held by the [`SubscriptionRegistry`](crate::framework::SubscriptionRegistry)
//! and the `Processor` operations over them.

pub mod delivery_stats;
pub mod subscription;

/// Opaque identifier of the platform user owning a subscription.
pub type OwnerId = compact_str::CompactString;

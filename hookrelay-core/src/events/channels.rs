//! Delivery job channel factory.

use super::types::DeliveryJob;
use tokio::sync::mpsc;

/// Sender handle for delivery jobs. Cloned into every `Dispatcher`.
pub type DeliveryJobSender = mpsc::UnboundedSender<DeliveryJob>;
/// Receiver handle for delivery jobs. Owned by the single `DeliveryWorker`.
pub type DeliveryJobReceiver = mpsc::UnboundedReceiver<DeliveryJob>;

/// Create a new delivery job channel.
///
/// Unbounded: enqueueing never waits on the worker, however far behind it
/// is. Backlog is bounded only by the number of matching subscriptions per
/// trigger.
pub fn delivery_job_channel() -> (DeliveryJobSender, DeliveryJobReceiver) {
    mpsc::unbounded_channel()
}

//! The delivery pipeline.
//!
//! - `Dispatcher`: matches triggered events, emits `DeliveryJob`s
//! - `DeliveryWorker`: receives `DeliveryJob`s, drives attempts and retries
//! - `DeliveryExecutor`: performs one signed HTTP attempt
//! - `RetryController`: reschedules or finalizes failed jobs

pub mod delivery_worker;
pub mod dispatcher;
pub mod executor;
pub mod retry;

pub use delivery_worker::DeliveryWorker;
pub use dispatcher::{DispatchError, Dispatcher};
pub use executor::{AttemptReport, DeliveryExecutor};
pub use retry::{FailureNotifier, LogFailureNotifier, RetryController};

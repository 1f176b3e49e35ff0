//! Event and job types flowing through the dispatch pipeline.
//!
//! # Flow
//!
//! 1. A producer calls `Dispatcher::trigger` with an [`Event`]
//! 2. One [`DeliveryJob`] per matching subscription goes into the job channel
//! 3. `DeliveryWorker` attempts each job and produces a [`DeliveryOutcome`]
//! 4. Failed jobs come back with a later `next_attempt_at`, or end as a
//!    [`TerminalFailure`]

pub mod channels;
pub mod types;

pub use channels::{DeliveryJobReceiver, DeliveryJobSender, delivery_job_channel};
pub use types::{DeliveryError, DeliveryJob, DeliveryOutcome, Event, TerminalFailure, TriggerOptions};

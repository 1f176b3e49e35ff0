//! DeliveryWorker.
//!
//! The single consumer of the delivery job channel:
//! - fresh jobs are attempted in arrival order
//! - retries wait in a deadline-ordered min-heap; the worker sleeps until
//!   the earliest deadline instead of polling
//! - exactly one attempt is in flight at a time
//!
//! The worker owns the channel receiver, so a dispatcher can only ever have
//! one of them.

use crate::events::{DeliveryJob, DeliveryJobReceiver};
use crate::processors::executor::DeliveryExecutor;
use crate::processors::retry::RetryController;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A job parked until `due`. Ties are broken by insertion order.
struct ScheduledJob {
    due: Instant,
    seq: u64,
    job: DeliveryJob,
}

impl PartialEq for ScheduledJob {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for ScheduledJob {}

impl PartialOrd for ScheduledJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

pub struct DeliveryWorker {
    jobs_rx: DeliveryJobReceiver,
    executor: DeliveryExecutor,
    retry: RetryController,
    scheduled: BinaryHeap<Reverse<ScheduledJob>>,
    next_seq: u64,
}

impl DeliveryWorker {
    pub(crate) fn new(
        jobs_rx: DeliveryJobReceiver,
        executor: DeliveryExecutor,
        retry: RetryController,
    ) -> Self {
        Self {
            jobs_rx,
            executor,
            retry,
            scheduled: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Run until shutdown is signalled, or until every `Dispatcher` is
    /// dropped and no retry is pending.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("DeliveryWorker started");

        let mut channel_open = true;
        let mut shutdown_open = true;

        loop {
            if !channel_open && self.scheduled.is_empty() {
                info!("Delivery job channel closed and no retries pending");
                break;
            }

            let next_due = self.scheduled.peek().map(|Reverse(s)| s.due);

            tokio::select! {
                biased;

                changed = shutdown_rx.changed(), if shutdown_open => {
                    match changed {
                        Ok(()) if *shutdown_rx.borrow() => {
                            info!("DeliveryWorker received shutdown signal");
                            break;
                        }
                        Ok(()) => {}
                        // Nobody can signal shutdown any more; keep draining.
                        Err(_) => shutdown_open = false,
                    }
                }

                _ = tokio::time::sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                    if let Some(Reverse(scheduled)) = self.scheduled.pop() {
                        self.process(scheduled.job).await;
                    }
                }

                received = self.jobs_rx.recv(), if channel_open => {
                    match received {
                        Some(job) => self.accept(job).await,
                        None => channel_open = false,
                    }
                }

                else => break,
            }
        }

        if !self.scheduled.is_empty() {
            warn!(
                pending = self.scheduled.len(),
                "DeliveryWorker stopped with retries still scheduled"
            );
        }
        info!("DeliveryWorker shutdown complete");
    }

    /// Attempt a job now, or park it if it is not due yet.
    async fn accept(&mut self, job: DeliveryJob) {
        if job.is_due(Instant::now()) {
            self.process(job).await;
        } else {
            self.schedule(job);
        }
    }

    async fn process(&mut self, job: DeliveryJob) {
        let Some(report) = self.executor.execute(&job).await else {
            return;
        };
        if report.outcome.success {
            return;
        }
        if let Some(retry) = self
            .retry
            .handle_failure(job, &report.subscription, &report.outcome)
            .await
        {
            self.schedule(retry);
        }
    }

    fn schedule(&mut self, job: DeliveryJob) {
        debug!(
            job_id = %job.job_id,
            attempt = job.attempt,
            pending = self.scheduled.len() + 1,
            "Job parked until next attempt"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.scheduled.push(Reverse(ScheduledJob {
            due: job.next_attempt_at,
            seq,
            job,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn scheduled(due: Instant, seq: u64) -> Reverse<ScheduledJob> {
        let mut job = DeliveryJob::new(Uuid::nil(), Arc::new(Event::new("x", serde_json::Value::Null)));
        job.next_attempt_at = due;
        Reverse(ScheduledJob { due, seq, job })
    }

    #[tokio::test(start_paused = true)]
    async fn test_heap_pops_earliest_deadline_first() {
        let now = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(scheduled(now + Duration::from_secs(8), 0));
        heap.push(scheduled(now + Duration::from_secs(2), 1));
        heap.push(scheduled(now + Duration::from_secs(4), 2));
        heap.push(scheduled(now + Duration::from_secs(2), 3));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|Reverse(s)| s.seq)).collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
    }
}

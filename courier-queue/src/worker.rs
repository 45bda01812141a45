//! Delivery worker loop

use std::sync::Arc;

use courier_common::{Job, Signal};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::queue::Shared;

/// One member of the worker pool.
///
/// Pulls jobs until the buffer is closed and empty or a shutdown signal
/// arrives, whichever is first.
pub(crate) struct Worker {
    id: usize,
    shared: Arc<Shared>,
    shutdown: broadcast::Receiver<Signal>,
}

impl Worker {
    pub(crate) const fn new(
        id: usize,
        shared: Arc<Shared>,
        shutdown: broadcast::Receiver<Signal>,
    ) -> Self {
        Self {
            id,
            shared,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        let worker = self.id;
        debug!(worker, "Worker started");

        // Once every sender is gone no signal can arrive; keep draining the buffer.
        let mut signals_open = true;

        loop {
            let job = tokio::select! {
                biased;

                sig = self.shutdown.recv(), if signals_open => {
                    match sig {
                        Ok(Signal::Shutdown) | Err(RecvError::Lagged(_)) => {
                            info!(worker, "Worker received shutdown signal");
                            self.shared.begin_shutdown();
                            break;
                        }
                        Err(RecvError::Closed) => {
                            debug!(worker, "Shutdown channel closed");
                            signals_open = false;
                            continue;
                        }
                    }
                }

                job = self.shared.buffer.recv() => {
                    let Some(job) = job else {
                        debug!(worker, "Queue closed");
                        break;
                    };
                    job
                }
            };

            self.process(job).await;
        }

        debug!(worker, "Worker stopped");
    }

    async fn process(&self, mut job: Job) {
        let worker = self.id;
        debug!(worker, to = %job.to, retry_count = job.retry_count(), "Sending email");

        let err = match self.shared.transport.deliver(&job).await {
            Ok(()) => {
                info!(worker, to = %job.to, "Email sent");
                return;
            }
            Err(err) => err,
        };

        let retry_count = job.record_failure();
        let policy = self.shared.policy;
        warn!(worker, to = %job.to, retry_count, error = %err, "Delivery attempt failed");

        if policy.should_dead_letter(retry_count) {
            error!(
                worker,
                to = %job.to,
                retry_count,
                "Job moved to dead-letter store after {} retries",
                policy.retry_limit()
            );
            self.shared.dead_letters.append(job);
            return;
        }

        debug!(
            worker,
            to = %job.to,
            retries_left = policy.remaining(retry_count),
            "Retrying ({retry_count}/{})",
            policy.retry_limit()
        );

        if let Err(err) = self.shared.requeue.requeue(&self.shared.buffer, job) {
            let reason = err.to_string();
            let job = err.into_job();
            warn!(
                worker,
                to = %job.to,
                retry_count = job.retry_count(),
                reason,
                "Retry dropped"
            );
        }
    }
}

//! Dead-letter store for jobs that exhausted their retry budget

use std::sync::Arc;

use courier_common::Job;
use parking_lot::Mutex;

/// Append-only record of permanently failed jobs.
///
/// Appends and snapshots share one lock, so a snapshot never observes a
/// partially applied append. The store is unbounded and lives for the whole
/// process.
#[derive(Debug, Clone, Default)]
pub struct DeadLetterStore {
    jobs: Arc<Mutex<Vec<Job>>>,
}

impl DeadLetterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a job that will not be retried again
    pub fn append(&self, job: Job) {
        self.jobs.lock().push(job);
    }

    /// Copy of the current contents, in insertion order
    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

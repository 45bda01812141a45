//! Bounded job buffer

use std::num::NonZeroUsize;

use async_channel::{Receiver, Sender, TrySendError};
use courier_common::Job;

use crate::error::EnqueueError;

/// Fixed-capacity FIFO of jobs waiting for a worker.
///
/// Insertion never blocks: a full buffer rejects with [`EnqueueError::Full`]
/// and a closed one with [`EnqueueError::Closed`]. Any number of consumers may
/// wait on [`JobBuffer::recv`]; once closed they drain what is left and then
/// receive `None`.
#[derive(Debug, Clone)]
pub struct JobBuffer {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    capacity: NonZeroUsize,
}

impl JobBuffer {
    /// Create an empty buffer holding at most `capacity` jobs
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let (sender, receiver) = async_channel::bounded(capacity.get());
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Insert a job at the tail without waiting.
    ///
    /// # Errors
    ///
    /// Returns the job inside [`EnqueueError::Full`] when the buffer is at
    /// capacity, or inside [`EnqueueError::Closed`] once it has been closed.
    pub fn try_enqueue(&self, job: Job) -> Result<(), EnqueueError> {
        self.sender.try_send(job).map_err(|err| match err {
            TrySendError::Full(job) => EnqueueError::Full(job),
            TrySendError::Closed(job) => EnqueueError::Closed(job),
        })
    }

    /// Wait for the next job.
    ///
    /// Returns `None` once the buffer is closed and empty.
    pub async fn recv(&self) -> Option<Job> {
        self.receiver.recv().await.ok()
    }

    /// Stop accepting jobs and wake every waiting consumer.
    ///
    /// Returns `true` if this call closed the buffer.
    pub fn close(&self) -> bool {
        self.sender.close()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Number of jobs currently resident
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.receiver.is_full()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

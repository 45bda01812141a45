//! Typed errors for queue operations.
//!
//! - [`EnqueueError`] - the buffer refused a job (full or closed), the job is handed back
//! - [`DeliveryError`] - a delivery attempt failed and the job should be retried
//! - [`QueueError`] - lifecycle misuse of the [`crate::EmailQueue`]
//! - [`ConfigError`] - invalid queue configuration

use courier_common::Job;
use thiserror::Error;

/// Reasons the bounded buffer refuses a job.
///
/// Both variants return ownership of the rejected job to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    /// The buffer already holds `capacity` jobs.
    #[error("Queue is full")]
    Full(Job),

    /// The buffer was closed by a shutdown.
    #[error("Queue is closed")]
    Closed(Job),
}

impl EnqueueError {
    /// Take back the job that could not be enqueued
    #[must_use]
    pub fn into_job(self) -> Job {
        match self {
            Self::Full(job) | Self::Closed(job) => job,
        }
    }

    /// Returns `true` if the buffer was at capacity.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Returns `true` if the buffer no longer accepts jobs.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// A failed delivery attempt.
///
/// Every variant is treated as transient by the worker loop.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport simulated or observed a failure.
    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Errors from driving the queue lifecycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// `start_workers` was already called on this queue.
    #[error("Workers have already been started")]
    AlreadyStarted,

    /// The queue has been shut down and cannot start workers.
    #[error("Queue has been shut down")]
    ShutDown,
}

/// Invalid queue configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A value that must be at least one was zero.
    #[error("Invalid configuration for {field}: must be at least 1")]
    Zero { field: &'static str },
}

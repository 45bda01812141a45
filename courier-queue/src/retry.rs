//! Retry policy and the requeue step for failed jobs.
//!
//! The worker loop decides *whether* a job gets another attempt through
//! [`RetryPolicy`], and hands it to a [`Requeue`] implementation to decide
//! *how* it gets back into the buffer.

use std::time::Duration;

use courier_common::Job;
use rand::Rng;
use tracing::warn;

use crate::{buffer::JobBuffer, config::BackoffConfig, error::EnqueueError};

/// How many failed attempts a job may accumulate before it is dead-lettered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(retry_limit: u32) -> Self {
        Self { retry_limit }
    }

    #[must_use]
    pub const fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Check if a job with this many failures has exhausted its budget.
    ///
    /// With the default limit of 3 a job is dead-lettered on its fourth failure.
    #[must_use]
    pub const fn should_dead_letter(&self, retry_count: u32) -> bool {
        retry_count > self.retry_limit
    }

    /// Get the number of retries still available.
    ///
    /// Returns `0` once the limit has been reached.
    #[must_use]
    pub const fn remaining(&self, retry_count: u32) -> u32 {
        self.retry_limit.saturating_sub(retry_count)
    }
}

/// Resubmits a failed job that still has retries left.
pub trait Requeue: Send + Sync + std::fmt::Debug + 'static {
    /// Put `job` back in line for another attempt
    ///
    /// # Errors
    ///
    /// Returns the job if it could not be resubmitted. The caller drops it.
    fn requeue(&self, buffer: &JobBuffer, job: Job) -> Result<(), EnqueueError>;
}

/// Re-enqueue at the tail of the same buffer straight away.
///
/// A full buffer drops the retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Requeue for Immediate {
    fn requeue(&self, buffer: &JobBuffer, job: Job) -> Result<(), EnqueueError> {
        buffer.try_enqueue(job)
    }
}

/// Re-enqueue after an exponentially growing delay.
///
/// The delay runs on a detached task; a buffer that is full or closed by the
/// time it expires drops the retry.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
}

impl Backoff {
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay before the attempt following failure number `retry_count`
    #[must_use]
    pub fn delay(&self, retry_count: u32) -> Duration {
        backoff_delay(
            retry_count,
            self.config.base_delay_ms,
            self.config.max_delay_ms,
            self.config.jitter_factor,
        )
    }
}

impl Requeue for Backoff {
    fn requeue(&self, buffer: &JobBuffer, job: Job) -> Result<(), EnqueueError> {
        if buffer.is_closed() {
            return Err(EnqueueError::Closed(job));
        }

        let delay = self.delay(job.retry_count());
        let buffer = buffer.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = buffer.try_enqueue(job) {
                let job = err.into_job();
                warn!(
                    to = %job.to,
                    retry_count = job.retry_count(),
                    "Delayed retry dropped, queue unavailable"
                );
            }
        });

        Ok(())
    }
}

/// Calculate the delay before the next attempt
///
/// # Formula
/// `delay = min(base * 2^(attempt - 1), max) * (1 ± jitter)`
///
/// # Arguments
/// * `attempt` - The failure count (1-indexed)
/// * `base_delay_ms` - Delay after the first failure
/// * `max_delay_ms` - Cap on the un-jittered delay
/// * `jitter_factor` - Jitter factor (e.g., 0.2 for ±20%)
pub fn backoff_delay(
    attempt: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let delay = if exponent >= 63 {
        max_delay_ms
    } else {
        base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(max_delay_ms)
    };

    if jitter_factor <= 0.0 || delay == 0 {
        return Duration::from_millis(delay);
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let jittered = {
        let jitter_range = (delay as f64) * jitter_factor;
        let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
        ((delay as f64) + jitter).max(0.0) as u64
    };

    Duration::from_millis(jittered)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroUsize;

    use pretty_assertions::assert_eq;

    use super::*;

    fn buffer(capacity: usize) -> JobBuffer {
        JobBuffer::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_default_limit_is_three() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retry_limit(), 3);

        assert!(!policy.should_dead_letter(1));
        assert!(!policy.should_dead_letter(3));
        assert!(policy.should_dead_letter(4));
    }

    #[test]
    fn test_remaining() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.remaining(0), 3);
        assert_eq!(policy.remaining(2), 1);
        assert_eq!(policy.remaining(3), 0);
        assert_eq!(policy.remaining(9), 0);
    }

    #[test]
    fn test_zero_limit_dead_letters_first_failure() {
        let policy = RetryPolicy::new(0);
        assert!(policy.should_dead_letter(1));
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        assert_eq!(backoff_delay(1, 100, 10_000, 0.0), Duration::from_millis(100));
        assert_eq!(backoff_delay(2, 100, 10_000, 0.0), Duration::from_millis(200));
        assert_eq!(backoff_delay(3, 100, 10_000, 0.0), Duration::from_millis(400));
        assert_eq!(backoff_delay(20, 100, 10_000, 0.0), Duration::from_millis(10_000));
        assert_eq!(backoff_delay(200, 100, 10_000, 0.0), Duration::from_millis(10_000));
    }

    #[test]
    fn test_backoff_delay_jitter_within_range() {
        for _ in 0..50 {
            let delay = backoff_delay(2, 100, 10_000, 0.2).as_millis();
            assert!((160..=240).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_immediate_requeue_goes_to_tail() {
        let buffer = buffer(2);
        buffer.try_enqueue(Job::new("first@example.com", "S", "B")).unwrap();

        Immediate
            .requeue(&buffer, Job::new("retry@example.com", "S", "B"))
            .unwrap();

        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_immediate_requeue_into_full_buffer_is_rejected() {
        let buffer = buffer(1);
        buffer.try_enqueue(Job::new("first@example.com", "S", "B")).unwrap();

        let err = Immediate
            .requeue(&buffer, Job::new("retry@example.com", "S", "B"))
            .unwrap_err();
        assert!(err.is_full());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_requeue_waits_before_enqueue() {
        let buffer = buffer(1);
        let backoff = Backoff::new(BackoffConfig {
            base_delay_ms: 500,
            max_delay_ms: 5_000,
            jitter_factor: 0.0,
        });

        let mut job = Job::new("retry@example.com", "S", "B");
        job.record_failure();
        backoff.requeue(&buffer, job.clone()).unwrap();

        tokio::task::yield_now().await;
        assert!(buffer.is_empty());

        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(buffer.recv().await, Some(job));
    }

    #[test]
    fn test_backoff_requeue_into_closed_buffer_is_rejected() {
        let buffer = buffer(1);
        buffer.close();

        let err = Backoff::new(BackoffConfig::default())
            .requeue(&buffer, Job::new("retry@example.com", "S", "B"))
            .unwrap_err();
        assert!(err.is_closed());
    }
}

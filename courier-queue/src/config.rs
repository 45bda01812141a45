//! Queue configuration

use std::num::NonZeroUsize;

use serde::Deserialize;

use crate::error::ConfigError;

const fn default_workers() -> usize {
    3
}

const fn default_capacity() -> usize {
    10
}

const fn default_retry_limit() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    1000
}

const fn default_max_delay_ms() -> u64 {
    60_000
}

const fn default_jitter_factor() -> f64 {
    0.2
}

/// Sizing and retry behaviour of an [`crate::EmailQueue`]
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Number of concurrent delivery workers
    ///
    /// Default: 3
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum number of jobs waiting in the buffer
    ///
    /// Enqueues beyond this are rejected rather than blocking the caller.
    ///
    /// Default: 10
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            capacity: default_capacity(),
            retry: RetryConfig::default(),
        }
    }
}

impl QueueConfig {
    /// Check that the worker count and capacity are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] naming the first field that is zero.
    pub fn validate(&self) -> Result<(NonZeroUsize, NonZeroUsize), ConfigError> {
        let workers =
            NonZeroUsize::new(self.workers).ok_or(ConfigError::Zero { field: "workers" })?;
        let capacity =
            NonZeroUsize::new(self.capacity).ok_or(ConfigError::Zero { field: "capacity" })?;

        Ok((workers, capacity))
    }
}

/// Retry behaviour for failed deliveries
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Failures tolerated before a job is dead-lettered
    ///
    /// Default: 3
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Delay retries with exponential backoff instead of re-enqueuing at once
    ///
    /// Default: None (immediate re-enqueue)
    #[serde(default)]
    pub backoff: Option<BackoffConfig>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            backoff: None,
        }
    }
}

/// Exponential backoff between retries
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    /// Delay after the first failure (in milliseconds)
    ///
    /// Subsequent failures double this delay up to `max_delay_ms`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay between retries (in milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter factor for retry delays (0.0 to 1.0)
    ///
    /// A factor of 0.2 means ±20% randomness.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

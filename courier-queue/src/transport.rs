//! Delivery transports
//!
//! A [`Transport`] performs one delivery attempt for a job. The workers treat
//! every error as transient and feed it into the retry state machine.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use courier_common::Job;
use rand::Rng;
use serde::Deserialize;

use crate::error::DeliveryError;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Attempt to deliver a single job
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the attempt failed.
    async fn deliver(&self, job: &Job) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T: Transport> Transport for Arc<T> {
    async fn deliver(&self, job: &Job) -> Result<(), DeliveryError> {
        (**self).deliver(job).await
    }
}

const fn default_failure_rate() -> f64 {
    1.0 / 3.0
}

const fn default_send_delay_ms() -> u64 {
    1000
}

/// Stand-in transport that never touches the network.
///
/// Each attempt fails with probability `failure_rate`; successful attempts
/// take `send_delay_ms` to complete.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedTransport {
    /// Probability (0.0 to 1.0) that an attempt fails
    ///
    /// Default: one in three
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,

    /// Time a successful send takes (in milliseconds)
    ///
    /// Default: 1000
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self {
            failure_rate: default_failure_rate(),
            send_delay_ms: default_send_delay_ms(),
        }
    }
}

impl SimulatedTransport {
    fn should_fail(&self) -> bool {
        if self.failure_rate.is_nan() {
            return false;
        }

        rand::rng().random_bool(self.failure_rate.clamp(0.0, 1.0))
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn deliver(&self, job: &Job) -> Result<(), DeliveryError> {
        if self.should_fail() {
            return Err(DeliveryError::Failed(format!(
                "simulated failure sending to {}",
                job.to
            )));
        }

        tokio::time::sleep(Duration::from_millis(self.send_delay_ms)).await;
        Ok(())
    }
}

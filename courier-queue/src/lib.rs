//! In-memory email job queue
//!
//! This crate provides:
//! - A bounded, non-blocking job buffer
//! - A fixed pool of delivery workers with bounded retries
//! - A dead-letter store for jobs that exhausted their retry budget
//! - The [`EmailQueue`] facade tying them together with a start/shutdown/wait lifecycle

mod buffer;
mod config;
mod dead_letter;
mod error;
mod queue;
pub mod retry;
pub mod transport;
mod worker;

pub use buffer::JobBuffer;
pub use config::{BackoffConfig, QueueConfig, RetryConfig};
pub use courier_common::{Job, Signal};
pub use dead_letter::DeadLetterStore;
pub use error::{ConfigError, DeliveryError, EnqueueError, QueueError};
pub use queue::{EmailQueue, QueueState, QueueStats};
pub use retry::{Backoff, Immediate, Requeue, RetryPolicy};
pub use transport::{SimulatedTransport, Transport};

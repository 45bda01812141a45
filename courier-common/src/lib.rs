//! Types shared by every courier crate: the [`Job`] that flows through the
//! queue, the shutdown [`Signal`] and the logging setup.

pub mod job;
pub mod logging;

pub use job::Job;
pub use tracing;

/// Broadcast to every long running component when the process is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}

//! Queue facade and lifecycle

use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use courier_common::{Job, Signal, internal};
use serde::Serialize;
use tokio::{
    sync::{
        Mutex,
        broadcast::{self, error::TryRecvError},
    },
    task::JoinSet,
};
use tracing::{error, info};

use crate::{
    buffer::JobBuffer,
    config::QueueConfig,
    dead_letter::DeadLetterStore,
    error::{ConfigError, EnqueueError, QueueError},
    retry::{Backoff, Immediate, Requeue, RetryPolicy},
    transport::Transport,
    worker::Worker,
};

/// Lifecycle of an [`EmailQueue`].
///
/// `Constructed -> WorkersRunning -> ShuttingDown -> Drained`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum QueueState {
    Constructed = 0,
    WorkersRunning = 1,
    ShuttingDown = 2,
    Drained = 3,
}

impl QueueState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Constructed,
            1 => Self::WorkersRunning,
            2 => Self::ShuttingDown,
            _ => Self::Drained,
        }
    }
}

/// Point-in-time view of the queue for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub state: QueueState,
    pub capacity: usize,
    pub queued: usize,
    pub workers: usize,
    pub dead_letters: usize,
}

/// State shared between the facade and its workers
pub(crate) struct Shared {
    pub(crate) buffer: JobBuffer,
    pub(crate) dead_letters: DeadLetterStore,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) requeue: Arc<dyn Requeue>,
    pub(crate) policy: RetryPolicy,
    state: AtomicU8,
}

impl Shared {
    fn state(&self) -> QueueState {
        QueueState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Close the buffer and move to `ShuttingDown`, unless already past it.
    pub(crate) fn begin_shutdown(&self) {
        if self.buffer.close() {
            internal!(level = DEBUG, "Job buffer closed");
        }

        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < QueueState::ShuttingDown as u8)
                    .then_some(QueueState::ShuttingDown as u8)
            });
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("buffer", &self.buffer)
            .field("dead_letters", &self.dead_letters.len())
            .field("requeue", &self.requeue)
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Bounded email job queue with a fixed pool of delivery workers.
///
/// ```ignore
/// let queue = EmailQueue::new(QueueConfig::default(), SimulatedTransport::default())?;
/// queue.start_workers(shutdown.subscribe())?;
///
/// queue.enqueue(Job::new("user@example.com", "Hello", "World"))?;
///
/// queue.shutdown();
/// queue.wait().await;
/// ```
#[derive(Debug)]
pub struct EmailQueue {
    shared: Arc<Shared>,
    workers: usize,
    handles: Mutex<JoinSet<()>>,
}

impl EmailQueue {
    /// Create a queue using the requeue strategy named by the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the worker count or capacity is zero.
    pub fn new(config: QueueConfig, transport: impl Transport) -> Result<Self, ConfigError> {
        let requeue: Arc<dyn Requeue> = match config.retry.backoff.clone() {
            Some(backoff) => Arc::new(Backoff::new(backoff)),
            None => Arc::new(Immediate),
        };

        Self::with_requeue(config, transport, requeue)
    }

    /// Create a queue with a custom requeue strategy for failed jobs
    ///
    /// # Errors
    ///
    /// Returns an error if the worker count or capacity is zero.
    pub fn with_requeue(
        config: QueueConfig,
        transport: impl Transport,
        requeue: Arc<dyn Requeue>,
    ) -> Result<Self, ConfigError> {
        let (workers, capacity) = config.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                buffer: JobBuffer::new(capacity),
                dead_letters: DeadLetterStore::new(),
                transport: Arc::new(transport),
                requeue,
                policy: RetryPolicy::new(config.retry.retry_limit),
                state: AtomicU8::new(QueueState::Constructed as u8),
            }),
            workers: workers.get(),
            handles: Mutex::new(JoinSet::new()),
        })
    }

    /// Submit a job without waiting for room.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError::Full`] if the buffer is at capacity, or
    /// [`EnqueueError::Closed`] after [`EmailQueue::shutdown`].
    pub fn enqueue(&self, job: Job) -> Result<(), EnqueueError> {
        self.shared.buffer.try_enqueue(job)
    }

    /// Spawn the worker pool onto the current tokio runtime.
    ///
    /// Every worker gets its own subscription to `shutdown` and exits as soon
    /// as a [`Signal::Shutdown`] is received. If `shutdown` already holds a
    /// signal no workers are spawned and the queue moves to
    /// [`QueueState::ShuttingDown`].
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadyStarted`] on a second call, or
    /// [`QueueError::ShutDown`] if the queue was shut down first. No workers
    /// are spawned in either case.
    pub fn start_workers(
        &self,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> Result<(), QueueError> {
        let Ok(mut handles) = self.handles.try_lock() else {
            return Err(QueueError::AlreadyStarted);
        };

        self.shared
            .state
            .compare_exchange(
                QueueState::Constructed as u8,
                QueueState::WorkersRunning as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|current| match QueueState::from_u8(current) {
                QueueState::WorkersRunning => QueueError::AlreadyStarted,
                _ => QueueError::ShutDown,
            })?;

        // A receiver only sees signals sent after it subscribed, so one that
        // already fired has to be taken from the caller's receiver here.
        if matches!(
            shutdown.try_recv(),
            Ok(Signal::Shutdown) | Err(TryRecvError::Lagged(_))
        ) {
            info!("Shutdown signalled before workers started");
            self.shared.begin_shutdown();
            return Ok(());
        }

        for id in 1..=self.workers {
            let worker = Worker::new(id, Arc::clone(&self.shared), shutdown.resubscribe());
            handles.spawn(worker.run());
        }
        drop(handles);

        info!(
            workers = self.workers,
            capacity = self.shared.buffer.capacity(),
            retry_limit = self.shared.policy.retry_limit(),
            "Workers started"
        );

        Ok(())
    }

    /// Close the buffer.
    ///
    /// Later enqueues fail with [`EnqueueError::Closed`]; idle workers wake up,
    /// drain whatever is left and exit. Safe to call more than once.
    pub fn shutdown(&self) {
        internal!("Queue shutdown requested");
        self.shared.begin_shutdown();
    }

    /// Wait until every spawned worker has exited.
    ///
    /// Returns immediately if the workers were never started.
    pub async fn wait(&self) {
        if self.state() == QueueState::Constructed {
            return;
        }

        let mut handles = self.handles.lock().await;
        while let Some(result) = handles.join_next().await {
            if let Err(err) = result {
                error!(error = %err, "Worker terminated abnormally");
            }
        }

        if self
            .shared
            .state
            .swap(QueueState::Drained as u8, Ordering::AcqRel)
            != QueueState::Drained as u8
        {
            info!("All workers finished");
        }
    }

    /// Copy of every job that exhausted its retries
    pub fn dead_letters(&self) -> Vec<Job> {
        self.shared.dead_letters.snapshot()
    }

    pub fn state(&self) -> QueueState {
        self.shared.state()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            state: self.state(),
            capacity: self.shared.buffer.capacity(),
            queued: self.shared.buffer.len(),
            workers: self.workers,
            dead_letters: self.shared.dead_letters.len(),
        }
    }
}

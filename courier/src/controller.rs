use std::sync::{Arc, LazyLock};

use courier_api::{ApiConfig, ApiServer};
use courier_common::{Signal, internal, logging};
use courier_queue::{EmailQueue, QueueConfig, SimulatedTransport};
use serde::Deserialize;
use tokio::sync::broadcast;

/// Everything the service runs, as read from the configuration file
#[derive(Debug, Default, Deserialize)]
pub struct Courier {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub transport: SimulatedTransport,
    #[serde(default)]
    pub api: ApiConfig,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Wait for SIGINT or SIGTERM
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    Ok(())
}

impl Courier {
    /// Run the queue and the HTTP server until a shutdown signal arrives,
    /// then drain the workers
    ///
    /// # Errors
    ///
    /// This function will return an error if the configuration is invalid,
    /// the HTTP server cannot bind, or the server fails while running.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(&SHUTDOWN_BROADCAST, shutdown()).await
    }

    /// Serve until `stop` resolves, then broadcast [`Signal::Shutdown`] on
    /// `signals`, close the queue and wait for every worker to exit.
    async fn run_until(
        self,
        signals: &broadcast::Sender<Signal>,
        stop: impl Future<Output = anyhow::Result<()>> + Send,
    ) -> anyhow::Result<()> {
        internal!("Controller running");

        let queue = Arc::new(EmailQueue::new(self.queue, self.transport)?);
        let server = ApiServer::new(self.api, Arc::clone(&queue)).await?;

        queue.start_workers(signals.subscribe())?;
        let serve = server.serve(signals.subscribe());
        tokio::pin!(serve);

        let ret = tokio::select! {
            r = &mut serve => r.map_err(anyhow::Error::from),
            r = stop => {
                // Nobody listening just means every component already stopped.
                let _ = signals.send(Signal::Shutdown);
                match r {
                    Ok(()) => serve.await.map_err(anyhow::Error::from),
                    Err(e) => Err(e),
                }
            }
        };

        let _ = signals.send(Signal::Shutdown);
        queue.shutdown();

        tokio::select! {
            () = queue.wait() => {
                internal!(level = INFO, "All workers finished, exiting");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!(
                    dead_letters = queue.stats().dead_letters,
                    "Forced shutdown before workers finished"
                );
            }
        }

        ret
    }
}

/// Initialise logging and run the service
///
/// # Errors
///
/// Propagates any error from [`Courier::run`].
pub async fn run(courier: Courier, source: Option<&std::path::Path>) -> anyhow::Result<()> {
    logging::init();

    match source {
        Some(path) => internal!(level = INFO, "Loaded configuration from {}", path.display()),
        None => internal!(level = INFO, "No configuration file found, using defaults"),
    }

    courier.run().await
}

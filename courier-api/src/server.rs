//! Ingress HTTP server

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use courier_common::Signal;
use courier_queue::EmailQueue;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::{ApiConfig, ApiError, handlers};

/// Build the router for every ingress endpoint.
///
/// Methods other than the routed ones are answered with 405.
pub fn router(queue: Arc<EmailQueue>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/send-email", post(handlers::send_email))
        .route("/dlq", get(handlers::dead_letters))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .with_state(queue)
        .layer(TimeoutLayer::new(request_timeout))
}

/// HTTP server accepting email jobs for an [`EmailQueue`]
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// Bind the listener and build the router
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn new(config: ApiConfig, queue: Arc<EmailQueue>) -> Result<Self, ApiError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| ApiError::BindError {
                address: config.listen_address.clone(),
                source: e,
            })?;

        tracing::info!(
            address = %config.listen_address,
            "HTTP server bound successfully"
        );

        let router = router(queue, Duration::from_secs(config.request_timeout_secs));

        Ok(Self { listener, router })
    }

    /// Address the server is actually listening on
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the server until a shutdown signal is received
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), ApiError> {
        tracing::info!("HTTP server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await
            .map_err(|e| ApiError::ServerError(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

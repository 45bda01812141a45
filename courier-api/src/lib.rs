//! HTTP ingress for the courier email queue
//!
//! # Endpoints
//!
//! - **`POST /send-email`** - Validate a `{to, subject, body}` JSON request and enqueue it
//! - **`GET /dlq`** - Dead-letter store snapshot as a JSON array
//! - **`/health/live`** - Liveness probe: Returns 200 while the server responds
//! - **`/health/ready`** - Readiness probe: Returns 200 while workers run and the queue has room
//!
//! # Usage
//!
//! ```rust,no_run
//! use courier_api::{ApiConfig, ApiServer};
//! use courier_queue::{EmailQueue, QueueConfig, SimulatedTransport};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Arc::new(EmailQueue::new(QueueConfig::default(), SimulatedTransport::default())?);
//! let server = ApiServer::new(ApiConfig::default(), queue).await?;
//!
//! // server.serve(shutdown_receiver).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handlers;
mod server;
mod validation;

pub use config::ApiConfig;
pub use error::{ApiError, RequestError};
pub use server::{ApiServer, router};
pub use validation::{EmailRequest, ValidationError};

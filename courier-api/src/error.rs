//! Ingress error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_queue::EnqueueError;
use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that stop the HTTP server itself
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address
    #[error("Failed to bind HTTP server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    /// HTTP server encountered a runtime error
    #[error("HTTP server error: {0}")]
    ServerError(String),
}

/// Reasons a single request is refused, rendered as a plain-text response
#[derive(Debug, Error)]
pub enum RequestError {
    /// The body was not a JSON object of string fields
    #[error("Invalid JSON")]
    InvalidJson,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Enqueue(#[from] EnqueueError),
}

impl RequestError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Enqueue(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

//! Request handlers

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_common::Job;
use courier_queue::{EmailQueue, QueueState};
use tracing::{debug, info, warn};

use crate::{error::RequestError, validation::EmailRequest};

/// `POST /send-email`
///
/// Decodes the body by hand so malformed JSON (400) stays distinct from
/// missing fields (422).
pub(crate) async fn send_email(
    State(queue): State<Arc<EmailQueue>>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), RequestError> {
    let request: EmailRequest = serde_json::from_slice(&body).map_err(|err| {
        debug!(error = %err, "Rejecting malformed request body");
        RequestError::InvalidJson
    })?;

    let job = request.into_job().inspect_err(|err| {
        debug!(reason = %err, "Rejecting invalid request");
    })?;

    let to = job.to.clone();
    queue.enqueue(job).inspect_err(|err| {
        warn!(to = %to, reason = %err, "Rejecting request, queue unavailable");
    })?;

    info!(to = %to, "Job enqueued");
    Ok((StatusCode::ACCEPTED, "Job enqueued"))
}

/// `GET /dlq`
pub(crate) async fn dead_letters(State(queue): State<Arc<EmailQueue>>) -> Json<Vec<Job>> {
    Json(queue.dead_letters())
}

/// Liveness probe handler
///
/// Returns 200 OK as long as the server can respond at all.
pub(crate) async fn liveness() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// Readiness probe handler
///
/// Returns 200 OK while workers are running and the buffer has room.
pub(crate) async fn readiness(State(queue): State<Arc<EmailQueue>>) -> Response {
    let stats = queue.stats();

    if stats.state == QueueState::WorkersRunning && stats.queued < stats.capacity {
        (StatusCode::OK, "OK").into_response()
    } else {
        warn!(
            state = ?stats.state,
            queued = stats.queued,
            capacity = stats.capacity,
            dead_letters = stats.dead_letters,
            "Readiness probe failed"
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(stats)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use courier_common::Signal;
    use courier_queue::{QueueConfig, SimulatedTransport};
    use tokio::sync::broadcast;

    use super::*;

    fn queue(capacity: usize) -> Arc<EmailQueue> {
        let config = QueueConfig {
            workers: 1,
            capacity,
            ..Default::default()
        };
        Arc::new(EmailQueue::new(config, SimulatedTransport::default()).unwrap())
    }

    #[tokio::test]
    async fn test_liveness_probe_always_passes() {
        let response = liveness().await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_probe_fails_before_start() {
        let response = readiness(State(queue(4))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_readiness_probe_passes_while_running() {
        let (tx, _rx) = broadcast::channel::<Signal>(1);
        let queue = queue(4);
        queue.start_workers(tx.subscribe()).unwrap();

        let response = readiness(State(Arc::clone(&queue))).await;
        assert_eq!(response.status(), StatusCode::OK);

        queue.shutdown();
        queue.wait().await;

        let response = readiness(State(queue)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_send_email_accepts_valid_request() {
        let queue = queue(1);
        let body = Bytes::from_static(br#"{"to":"user@example.com","subject":"Hi","body":"Yo"}"#);

        let (status, message) = send_email(State(Arc::clone(&queue)), body).await.unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(message, "Job enqueued");
        assert_eq!(queue.stats().queued, 1);
    }

    #[tokio::test]
    async fn test_send_email_rejects_when_full() {
        let queue = queue(1);
        let body = Bytes::from_static(br#"{"to":"user@example.com","subject":"Hi","body":"Yo"}"#);

        send_email(State(Arc::clone(&queue)), body.clone())
            .await
            .unwrap();
        let err = send_email(State(queue), body).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

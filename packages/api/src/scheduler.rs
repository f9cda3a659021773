//! Scheduler routes over the queue actor.

use actors::QueueHandle;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pipeline_core::{Job, JobQueue, SchedulerStatus};

use crate::error::ApiResult;
use crate::health;

/// POST /queue
async fn enqueue(
    State(queue): State<QueueHandle>,
    body: Result<Json<Job>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let Json(job) = body?;
    let job = queue.enqueue(job).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// POST /queue/dequeue
///
/// 204 with no body when the queue is empty.
async fn dequeue(State(queue): State<QueueHandle>) -> ApiResult<Response> {
    Ok(match queue.dequeue().await? {
        Some(job) => Json(job).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// GET /queue
async fn list_queue(State(queue): State<QueueHandle>) -> ApiResult<Json<Vec<Job>>> {
    Ok(Json(queue.snapshot().await?))
}

/// GET /status
async fn status(State(queue): State<QueueHandle>) -> ApiResult<Json<SchedulerStatus>> {
    Ok(Json(queue.status().await?))
}

/// Create the scheduler router.
///
/// Routes:
/// - POST /queue - Enqueue a job
/// - GET  /queue - Queued jobs in FIFO order
/// - POST /queue/dequeue - Take the head job
/// - GET  /status - Enqueue/dequeue counters
/// - GET  /health
pub fn router(queue: QueueHandle) -> Router {
    Router::new()
        .route("/queue", get(list_queue).post(enqueue))
        .route("/queue/dequeue", post(dequeue))
        .route("/status", get(status))
        .merge(health::router("scheduler"))
        .with_state(queue)
}

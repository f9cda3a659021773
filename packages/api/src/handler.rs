//! Handler routes exposing worker pool metrics.

use std::sync::Arc;

use actors::WorkerMetrics;
use axum::{Json, Router, extract::State, routing::get};
use pipeline_core::WorkerStatus;

use crate::health;

/// GET /status
async fn status(State(metrics): State<Arc<WorkerMetrics>>) -> Json<WorkerStatus> {
    Json(metrics.snapshot())
}

/// Create the handler router.
///
/// Routes:
/// - GET /status - Worker pool counters
/// - GET /health
pub fn router(metrics: Arc<WorkerMetrics>) -> Router {
    Router::new()
        .route("/status", get(status))
        .merge(health::router("handler"))
        .with_state(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::send;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn idle_pool_status() {
        let app = router(Arc::new(WorkerMetrics::new()));
        let (status, body) = send(app, "GET", "/status", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isIdle"], true);
        assert_eq!(body["jobsProcessed"], 0);
        assert!(body["lastJobError"].is_null());
    }
}

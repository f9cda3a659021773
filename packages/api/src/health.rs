//! Health check endpoint shared by every service.

use axum::{Json, Router, routing::get};
use pipeline_core::HealthResponse;

/// Create the `/health` router for `service`.
pub fn router<S>(service: &'static str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/health",
        get(move || async move { Json(HealthResponse::ok(service)) }),
    )
}

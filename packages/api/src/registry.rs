//! Task registry routes over a `JobStore`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::get,
};
use pipeline_core::{Direction, Job, JobId, JobStore, JobUpdate};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::health;

type Store = Arc<dyn JobStore>;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub direction: Option<Direction>,
}

/// Unparseable IDs cannot name a stored job.
fn parse_id(raw: &str) -> ApiResult<JobId> {
    JobId::parse(raw).map_err(|_| ApiError::NotFound(raw.to_string()))
}

/// POST /jobs
async fn create_job(
    State(store): State<Store>,
    body: Result<Json<Job>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let Json(job) = body?;
    job.check_invariants().map_err(ApiError::BadRequest)?;

    let job = store.insert(job).await?;
    tracing::info!(request_id = %job.request_id, "Job record created");
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs?direction=
async fn list_jobs(
    State(store): State<Store>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Job>>> {
    let Query(query) = query?;
    let jobs = match query.direction {
        Some(direction) => store.find_by_direction(direction).await?,
        None => store.find_all().await?,
    };
    Ok(Json(jobs))
}

/// GET /jobs/{id}
async fn get_job(State(store): State<Store>, Path(id): Path<String>) -> ApiResult<Json<Job>> {
    let id = parse_id(&id)?;
    Ok(Json(store.find_by_id(id).await?))
}

/// PATCH /jobs/{id}
async fn update_job(
    State(store): State<Store>,
    Path(id): Path<String>,
    body: Result<Json<JobUpdate>, JsonRejection>,
) -> ApiResult<Json<Job>> {
    let id = parse_id(&id)?;
    let Json(update) = body?;

    let job = store.update(id, update).await?;
    tracing::info!(request_id = %id, state = %job.state, "Job record updated");
    Ok(Json(job))
}

/// DELETE /jobs
async fn clear_jobs(State(store): State<Store>) -> ApiResult<StatusCode> {
    store.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the registry router.
///
/// Routes:
/// - POST   /jobs - Create a job record
/// - GET    /jobs[?direction=] - List records in insertion order
/// - DELETE /jobs - Remove every record
/// - GET    /jobs/{id} - Get one record
/// - PATCH  /jobs/{id} - Apply a partial update
/// - GET    /health
pub fn router(store: Store) -> Router {
    Router::new()
        .route(
            "/jobs",
            get(list_jobs).post(create_job).delete(clear_jobs),
        )
        .route("/jobs/{id}", get(get_job).patch(update_job))
        .merge(health::router("registry"))
        .with_state(store)
}

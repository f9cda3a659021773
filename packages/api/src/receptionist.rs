//! Receptionist: validates submissions, records them and queues them.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use pipeline_core::{
    Direction, Job, JobId, JobQueue, JobState, JobStore, QueueError, StoreError, SubmitRequest,
    SubmitResponse, TypeAllowlist, ValidationErrors,
};
use thiserror::Error;

use crate::error::ApiResult;
use crate::health;

/// Jobs of one direction keyed by state. States without jobs are absent.
pub type JobsByState = BTreeMap<JobState, Vec<Job>>;

/// Why a submission was not accepted.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Failed to persist job: {0}")]
    Store(#[source] StoreError),

    #[error("Job {id} was persisted but not enqueued: {source}")]
    Enqueue {
        id: JobId,
        #[source]
        source: QueueError,
    },
}

/// Job submission service.
#[derive(Clone)]
pub struct Receptionist {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
    allowlist: TypeAllowlist,
}

impl Receptionist {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            store,
            queue,
            allowlist: TypeAllowlist::default(),
        }
    }

    /// Replace the per-direction type allowlist.
    pub fn with_allowlist(mut self, allowlist: TypeAllowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    /// Validate, persist, then enqueue one job.
    pub async fn submit(
        &self,
        request: &SubmitRequest,
        direction: Direction,
    ) -> Result<SubmitResponse, SubmitError> {
        let job = self.allowlist.validate(request, direction)?;
        let job_id = job.request_id;

        tracing::info!(
            request_id = %job_id,
            direction = %direction,
            job_type = %job.job_type,
            book_id = %job.book_id,
            "Job validated"
        );

        self.store.insert(job.clone()).await.map_err(SubmitError::Store)?;
        tracing::info!(request_id = %job_id, "Job created");

        if let Err(source) = self.queue.enqueue(job).await {
            // No rollback: the record stays pending and nothing re-enqueues it.
            tracing::error!(
                request_id = %job_id,
                error = %source,
                "Job persisted but not enqueued"
            );
            return Err(SubmitError::Enqueue { id: job_id, source });
        }
        tracing::info!(request_id = %job_id, "Job enqueued");

        Ok(SubmitResponse { job_id })
    }

    /// All jobs of a direction grouped by state, in store order within each state.
    pub async fn list(&self, direction: Direction) -> Result<JobsByState, StoreError> {
        let jobs = self.store.find_by_direction(direction).await?;
        Ok(group_by_state(jobs))
    }
}

fn group_by_state(jobs: Vec<Job>) -> JobsByState {
    let mut grouped = JobsByState::new();
    for job in jobs {
        grouped.entry(job.state).or_default().push(job);
    }
    grouped
}

async fn submit(
    receptionist: &Receptionist,
    body: Result<Json<SubmitRequest>, JsonRejection>,
    direction: Direction,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(request) = body?;
    let response = receptionist.submit(&request, direction).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /exports
async fn submit_export(
    State(receptionist): State<Arc<Receptionist>>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    submit(&receptionist, body, Direction::Export).await
}

/// POST /imports
async fn submit_import(
    State(receptionist): State<Arc<Receptionist>>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    submit(&receptionist, body, Direction::Import).await
}

/// GET /exports
async fn list_exports(
    State(receptionist): State<Arc<Receptionist>>,
) -> ApiResult<Json<JobsByState>> {
    Ok(Json(receptionist.list(Direction::Export).await?))
}

/// GET /imports
async fn list_imports(
    State(receptionist): State<Arc<Receptionist>>,
) -> ApiResult<Json<JobsByState>> {
    Ok(Json(receptionist.list(Direction::Import).await?))
}

/// Create the receptionist router.
///
/// Routes:
/// - POST /exports, POST /imports - Submit a job
/// - GET  /exports, GET  /imports - Jobs grouped by state
/// - GET  /health
pub fn router(receptionist: Arc<Receptionist>) -> Router {
    Router::new()
        .route("/exports", get(list_exports).post(submit_export))
        .route("/imports", get(list_imports).post(submit_import))
        .merge(health::router("receptionist"))
        .with_state(receptionist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingQueue, FailingStore, in_process, send};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn export_submission_is_pending_and_queued() {
        let (store, queue) = in_process().await;
        let receptionist = Arc::new(Receptionist::new(store.clone(), queue.clone()));
        let app = router(receptionist);

        let (status, body) = send(
            app.clone(),
            "POST",
            "/exports",
            Some(json!({"bookId": "b1", "type": "pdf"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let job_id = JobId::parse(body["jobId"].as_str().unwrap()).unwrap();

        let (status, listing) = send(app, "GET", "/exports", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["pending"][0]["requestId"], job_id.to_string());
        assert!(listing.get("processing").is_none());

        let queued = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(queued.request_id, job_id);
    }

    #[tokio::test]
    async fn import_submission_keeps_source_url() {
        let (store, queue) = in_process().await;
        let app = router(Arc::new(Receptionist::new(store.clone(), queue)));

        let (status, body) = send(
            app,
            "POST",
            "/imports",
            Some(json!({"bookId": "b1", "type": "wattpad", "url": "https://example.com/story"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let id = JobId::parse(body["jobId"].as_str().unwrap()).unwrap();
        let job = store.find_by_id(id).await.unwrap();
        assert_eq!(job.direction, Direction::Import);
        assert_eq!(job.source_url.as_deref(), Some("https://example.com/story"));
    }

    #[tokio::test]
    async fn invalid_type_is_rejected_before_any_side_effect() {
        let (store, queue) = in_process().await;
        let app = router(Arc::new(Receptionist::new(store.clone(), queue.clone())));

        let (status, body) = send(
            app,
            "POST",
            "/exports",
            Some(json!({"bookId": "b2", "type": "invalid"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("type"));
        assert_eq!(body["details"][0]["field"], "type");

        assert!(store.find_all().await.unwrap().is_empty());
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn import_without_url_is_rejected() {
        let (store, queue) = in_process().await;
        let app = router(Arc::new(Receptionist::new(store, queue)));

        let (status, body) = send(
            app,
            "POST",
            "/imports",
            Some(json!({"bookId": "b1", "type": "word"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "url");
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (store, queue) = in_process().await;
        let app = router(Arc::new(Receptionist::new(store, queue)));

        let request = Request::builder()
            .method("POST")
            .uri("/exports")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn store_failure_is_internal_and_nothing_is_queued() {
        let (_, queue) = in_process().await;
        let receptionist = Receptionist::new(Arc::new(FailingStore), queue.clone());

        let err = receptionist
            .submit(&SubmitRequest::export("b1", "epub"), Direction::Export)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Store(_)));
        assert_eq!(queue.len().await.unwrap(), 0);

        let app = router(Arc::new(receptionist));
        let (status, _) = send(
            app,
            "POST",
            "/exports",
            Some(json!({"bookId": "b1", "type": "epub"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn enqueue_failure_leaves_the_record_pending() {
        let (store, _) = in_process().await;
        let receptionist = Receptionist::new(store.clone(), Arc::new(FailingQueue));

        let err = receptionist
            .submit(&SubmitRequest::export("b1", "pdf"), Direction::Export)
            .await
            .unwrap_err();
        let id = match err {
            SubmitError::Enqueue { id, .. } => id,
            other => panic!("expected an enqueue failure, got {other:?}"),
        };

        let job = store.find_by_id(id).await.unwrap();
        assert_eq!(job.state, JobState::Pending);
    }

    #[tokio::test]
    async fn listing_groups_by_state_and_omits_empty_states() {
        let (store, queue) = in_process().await;
        let receptionist = Receptionist::new(store.clone(), queue);

        let mut ids = Vec::new();
        for book in ["b1", "b2", "b3"] {
            let response = receptionist
                .submit(&SubmitRequest::export(book, "epub"), Direction::Export)
                .await
                .unwrap();
            ids.push(response.job_id);
        }
        store
            .update(ids[1], pipeline_core::JobUpdate::processing())
            .await
            .unwrap();

        let grouped = receptionist.list(Direction::Export).await.unwrap();
        assert_eq!(grouped.len(), 2);
        let pending: Vec<_> = grouped[&JobState::Pending].iter().map(|j| j.request_id).collect();
        assert_eq!(pending, vec![ids[0], ids[2]]);
        assert_eq!(grouped[&JobState::Processing][0].request_id, ids[1]);

        assert!(receptionist.list(Direction::Import).await.unwrap().is_empty());
    }
}

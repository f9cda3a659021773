//! Shared helpers for router tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pipeline_core::{Direction, Job, JobId, JobQueue, JobStore, JobUpdate, QueueError, StoreError};
use serde_json::Value;
use tower::ServiceExt;

/// Fresh in-memory store and a running queue actor.
pub async fn in_process() -> (Arc<dyn JobStore>, Arc<dyn JobQueue>) {
    let store = db::init(&db::DbConfig::memory()).await.unwrap();
    let (queue, _handle) = actors::start_queue().await.unwrap();
    (Arc::new(store), Arc::new(queue))
}

/// Send one request and decode the JSON body (`Null` when empty).
pub async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn down() -> StoreError {
    StoreError::Unavailable("store is down".into())
}

/// Store whose every call fails.
pub struct FailingStore;

impl JobStore for FailingStore {
    fn insert(&self, _job: Job) -> BoxFuture<'_, Result<Job, StoreError>> {
        async { Err(down()) }.boxed()
    }

    fn update(&self, _id: JobId, _update: JobUpdate) -> BoxFuture<'_, Result<Job, StoreError>> {
        async { Err(down()) }.boxed()
    }

    fn find_by_id(&self, _id: JobId) -> BoxFuture<'_, Result<Job, StoreError>> {
        async { Err(down()) }.boxed()
    }

    fn find_by_direction(&self, _d: Direction) -> BoxFuture<'_, Result<Vec<Job>, StoreError>> {
        async { Err(down()) }.boxed()
    }

    fn find_all(&self) -> BoxFuture<'_, Result<Vec<Job>, StoreError>> {
        async { Err(down()) }.boxed()
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        async { Err(down()) }.boxed()
    }
}

/// Queue that refuses every call.
pub struct FailingQueue;

impl JobQueue for FailingQueue {
    fn enqueue(&self, _job: Job) -> BoxFuture<'_, Result<Job, QueueError>> {
        async { Err(QueueError::Unavailable("queue is down".into())) }.boxed()
    }

    fn dequeue(&self) -> BoxFuture<'_, Result<Option<Job>, QueueError>> {
        async { Err(QueueError::Unavailable("queue is down".into())) }.boxed()
    }

    fn len(&self) -> BoxFuture<'_, Result<usize, QueueError>> {
        async { Err(QueueError::Unavailable("queue is down".into())) }.boxed()
    }
}

#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use actors::{
    ProcessingProfile, SimulatedProcessor, SupervisorMessage, WorkerContext, WorkerMetrics,
    WorkerSettings, start_supervisor,
};
use api::{ClientError, PipelineConfig, Receptionist, RegistryClient, SchedulerClient, routers};
use axum::http::StatusCode;
use pipeline_core::{
    Direction, Job, JobQueue, JobState, JobStore, JobType, JobUpdate, QueueError, StoreError,
};
use serde_json::json;

async fn registry() -> Result<RegistryClient, Box<dyn Error>> {
    let store = db::init(&db::DbConfig::memory()).await?;
    let url = common::serve(routers::registry(Arc::new(store))).await;
    Ok(RegistryClient::new(url, common::TIMEOUT)?)
}

async fn scheduler() -> Result<SchedulerClient, Box<dyn Error>> {
    let (queue, _handle) = actors::start_queue().await?;
    let url = common::serve(routers::scheduler(queue)).await;
    Ok(SchedulerClient::new(url, common::TIMEOUT)?)
}

#[tokio::test]
async fn registry_client_round_trips_records() -> Result<(), Box<dyn Error>> {
    let client = registry().await?;

    let export = Job::new("b1", Direction::Export, JobType::Pdf);
    let import = Job::new("b2", Direction::Import, JobType::Word)
        .with_source_url("https://example.com/doc");

    assert_eq!(client.insert(export.clone()).await?, export);
    client.insert(import.clone()).await?;
    assert!(matches!(
        client.insert(export.clone()).await,
        Err(StoreError::DuplicateKey(id)) if id == export.request_id
    ));

    assert_eq!(client.find_by_id(import.request_id).await?, import);
    let exports = client.find_by_direction(Direction::Export).await?;
    assert_eq!(exports, vec![export.clone()]);
    assert_eq!(client.find_all().await?.len(), 2);

    let updated = client
        .update(export.request_id, JobUpdate::processing())
        .await?;
    assert_eq!(updated.state, JobState::Processing);

    let err = client
        .update(export.request_id, JobUpdate { state: Some(JobState::Finished), result_url: None })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidUpdate(_)));

    let finished = client
        .update(export.request_id, JobUpdate::finished("https://r.test/exports/1"))
        .await?;
    assert_eq!(finished.result_url.as_deref(), Some("https://r.test/exports/1"));

    client.clear().await?;
    assert!(matches!(
        client.find_by_id(export.request_id).await,
        Err(StoreError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn terminal_jobs_reject_updates_like_the_local_store() -> Result<(), Box<dyn Error>> {
    let local = db::init(&db::DbConfig::memory()).await?;
    let remote = registry().await?;

    let job = Job::new("b1", Direction::Export, JobType::Pdf);
    for store in [&local as &dyn JobStore, &remote as &dyn JobStore] {
        store.insert(job.clone()).await?;
        store.update(job.request_id, JobUpdate::failed()).await?;

        let err = store
            .update(job.request_id, JobUpdate::processing())
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                StoreError::InvalidTransition {
                    id,
                    from: JobState::Failed,
                    to: JobState::Processing,
                } if id == job.request_id
            ),
            "{err:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn scheduler_client_preserves_fifo_order() -> Result<(), Box<dyn Error>> {
    let client = scheduler().await?;

    assert_eq!(client.dequeue().await?, None);

    let first = Job::new("b1", Direction::Export, JobType::Epub);
    let second = Job::new("b2", Direction::Export, JobType::Pdf);
    client.enqueue(first.clone()).await?;
    client.enqueue(second.clone()).await?;
    assert_eq!(client.len().await?, 2);
    assert_eq!(client.snapshot().await?, vec![first.clone(), second.clone()]);

    assert!(matches!(
        client.enqueue(first.clone()).await,
        Err(QueueError::Rejected(_))
    ));

    assert_eq!(client.dequeue().await?, Some(first.clone()));
    assert_eq!(client.dequeue().await?, Some(second));
    assert_eq!(client.dequeue().await?, None);

    let status = client.status().await?;
    assert_eq!(status.total_jobs_enqueued, 2);
    assert_eq!(status.total_jobs_dequeued, 2);
    assert_eq!(status.queue_length, 0);
    Ok(())
}

#[tokio::test]
async fn unreachable_services_are_unavailable() -> Result<(), Box<dyn Error>> {
    let store = RegistryClient::new(common::UNREACHABLE, common::TIMEOUT)?;
    let queue = SchedulerClient::new(common::UNREACHABLE, common::TIMEOUT)?;

    assert!(matches!(
        store.find_all().await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(matches!(queue.dequeue().await, Err(QueueError::Unavailable(_))));
    assert!(matches!(queue.status().await, Err(ClientError::Transport(_))));

    let app = routers::receptionist(Arc::new(Receptionist::new(
        Arc::new(store),
        Arc::new(queue),
    )));
    let (status, body) = common::send(app, "GET", "/exports", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn split_receptionist_reaches_remote_services() -> Result<(), Box<dyn Error>> {
    let store = registry().await?;
    let queue = scheduler().await?;
    let config = PipelineConfig::default();

    let receptionist = Receptionist::new(Arc::new(store.clone()), Arc::new(queue.clone()))
        .with_allowlist(config.allowlist);
    let app = routers::receptionist(Arc::new(receptionist));

    let (status, body) = common::send(
        app.clone(),
        "POST",
        "/imports",
        Some(json!({"bookId": "b9", "type": "evernote", "url": "https://example.com/note"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let queued = queue.snapshot().await?;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].request_id.to_string(), job_id);
    assert_eq!(queued[0].state, JobState::Pending);

    let (status, listing) = common::send(app, "GET", "/imports", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["pending"][0]["requestId"], job_id);
    assert_eq!(listing["pending"][0]["bookId"], "b9");
    Ok(())
}

#[tokio::test]
async fn remote_workers_drive_jobs_to_finished() -> Result<(), Box<dyn Error>> {
    let store = registry().await?;
    let queue = scheduler().await?;

    let profile =
        ProcessingProfile::default().with_fallback(Direction::Export, Duration::from_millis(200));
    let ctx = WorkerContext {
        store: Arc::new(store.clone()),
        queue: Arc::new(queue.clone()),
        processor: Arc::new(SimulatedProcessor::new(profile, "https://r.test")),
        metrics: Arc::new(WorkerMetrics::new()),
        settings: WorkerSettings {
            poll_interval: Duration::from_millis(20),
            busy_backoff: Duration::from_millis(10),
            startup_delay: Duration::ZERO,
            job_timeout: None,
        },
    };
    let (supervisor, handle) = start_supervisor(1, ctx).await?;

    let job = Job::new("b1", Direction::Export, JobType::Pdf);
    store.insert(job.clone()).await?;
    queue.enqueue(job.clone()).await?;

    let mut seen = Vec::new();
    for _ in 0..250 {
        let current = store.find_by_id(job.request_id).await?;
        if seen.last() != Some(&current.state) {
            seen.push(current.state);
        }
        if current.state.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(seen.contains(&JobState::Processing), "{seen:?}");
    assert_eq!(seen.last(), Some(&JobState::Finished), "{seen:?}");

    let finished = store.find_by_id(job.request_id).await?;
    let prefix = format!("https://r.test/exports/{}-", job.request_id);
    let result_url = finished.result_url.unwrap_or_default();
    assert!(result_url.starts_with(&prefix), "{result_url}");
    assert_eq!(queue.len().await?, 0);

    assert!(supervisor.send_message(SupervisorMessage::Shutdown).is_ok());
    handle.await?;
    Ok(())
}

//! Service wiring for each deployment role.

use std::sync::Arc;

use actors::{
    ActorRef, QueueHandle, SimulatedProcessor, SpawnErr, SupervisorMessage, WorkerContext,
    WorkerMetrics, start_queue, start_supervisor,
};
use axum::Router;
use db::DbError;
use pipeline_core::{JobQueue, JobStore};
use thiserror::Error;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::clients::{ClientError, RegistryClient, SchedulerClient};
use crate::config::{PipelineConfig, Role};
use crate::receptionist::Receptionist;
use crate::{handler, receptionist, registry, scheduler};

/// Errors raised while starting a pipeline process.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Failed to spawn actor: {0}")]
    Spawn(#[from] SpawnErr),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// A running set of services and the actors behind them.
pub struct Pipeline {
    router: Router,
    queue: Option<(QueueHandle, JoinHandle<()>)>,
    supervisor: Option<(ActorRef<SupervisorMessage>, JoinHandle<()>)>,
}

impl Pipeline {
    /// Start every component the configured role needs.
    pub async fn start(config: &PipelineConfig) -> Result<Self, InitError> {
        tracing::info!(role = %config.role, "Initializing pipeline services");

        let pipeline = match config.role {
            Role::All => {
                let store: Arc<dyn JobStore> = Arc::new(db::init(&config.db).await?);
                let (queue, queue_task) = start_queue().await?;
                let queue_port: Arc<dyn JobQueue> = Arc::new(queue.clone());

                let (supervisor, metrics) =
                    start_workers(config, store.clone(), queue_port.clone()).await?;

                let receptionist = Receptionist::new(store.clone(), queue_port)
                    .with_allowlist(config.allowlist.clone());

                let router = receptionist::router(Arc::new(receptionist))
                    .nest("/registry", registry::router(store))
                    .nest("/scheduler", scheduler::router(queue.clone()))
                    .nest("/handler", handler::router(metrics));

                Self {
                    router,
                    queue: Some((queue, queue_task)),
                    supervisor: Some(supervisor),
                }
            }

            Role::Registry => {
                let store: Arc<dyn JobStore> = Arc::new(db::init(&config.db).await?);
                Self {
                    router: registry::router(store),
                    queue: None,
                    supervisor: None,
                }
            }

            Role::Scheduler => {
                let (queue, queue_task) = start_queue().await?;
                Self {
                    router: scheduler::router(queue.clone()),
                    queue: Some((queue, queue_task)),
                    supervisor: None,
                }
            }

            Role::Receptionist => {
                let store = RegistryClient::new(&config.registry_url, config.request_timeout)?;
                let queue = SchedulerClient::new(&config.scheduler_url, config.request_timeout)?;
                let receptionist = Receptionist::new(Arc::new(store), Arc::new(queue))
                    .with_allowlist(config.allowlist.clone());

                Self {
                    router: receptionist::router(Arc::new(receptionist)),
                    queue: None,
                    supervisor: None,
                }
            }

            Role::Handler => {
                let store = RegistryClient::new(&config.registry_url, config.request_timeout)?;
                let queue = SchedulerClient::new(&config.scheduler_url, config.request_timeout)?;
                let (supervisor, metrics) =
                    start_workers(config, Arc::new(store), Arc::new(queue)).await?;

                Self {
                    router: handler::router(metrics),
                    queue: None,
                    supervisor: Some(supervisor),
                }
            }
        };

        tracing::info!(role = %config.role, "Pipeline services ready");
        Ok(pipeline)
    }

    /// The HTTP surface of this process, with request tracing.
    pub fn router(&self) -> Router {
        self.router.clone().layer(TraceLayer::new_for_http())
    }

    /// Drain the workers, then stop the queue.
    pub async fn shutdown(self) {
        if let Some((supervisor, handle)) = self.supervisor {
            tracing::info!("Draining workers");
            if supervisor.send_message(SupervisorMessage::Shutdown).is_ok() {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "Supervisor task ended abnormally");
                }
            }
        }

        if let Some((queue, handle)) = self.queue {
            tracing::info!("Stopping queue");
            queue.shutdown();
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Queue task ended abnormally");
            }
        }

        tracing::info!("Pipeline stopped");
    }
}

async fn start_workers(
    config: &PipelineConfig,
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
) -> Result<((ActorRef<SupervisorMessage>, JoinHandle<()>), Arc<WorkerMetrics>), InitError> {
    let metrics = Arc::new(WorkerMetrics::new());
    let processor = SimulatedProcessor::new(config.processing_profile(), &config.result_base_url);
    let ctx = WorkerContext {
        store,
        queue,
        processor: Arc::new(processor),
        metrics: metrics.clone(),
        settings: config.worker.clone(),
    };

    let supervisor = start_supervisor(config.workers, ctx).await?;
    Ok((supervisor, metrics))
}

//! Worker actor that polls the queue and processes one job at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pipeline_core::{Job, JobId, JobQueue, JobStore, JobUpdate, ProcessError};
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::messages::WorkerMessage;
use crate::metrics::WorkerMetrics;
use crate::processor::JobProcessor;

/// Timing knobs for the poll loop.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Wait after an empty or failed dequeue.
    pub poll_interval: Duration,
    /// Wait before re-polling while a job is in flight.
    pub busy_backoff: Duration,
    /// Wait before the first poll.
    pub startup_delay: Duration,
    /// Optional upper bound on a single job's processing time.
    pub job_timeout: Option<Duration>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            busy_backoff: Duration::from_secs(1),
            startup_delay: Duration::from_secs(2),
            job_timeout: None,
        }
    }
}

/// Everything a worker needs, shared by the whole pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn JobQueue>,
    pub processor: Arc<dyn JobProcessor>,
    pub metrics: Arc<WorkerMetrics>,
    pub settings: WorkerSettings,
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub ctx: WorkerContext,
}

/// State for the worker actor.
pub struct WorkerActorState {
    pub worker_id: String,
    /// Job currently being processed.
    pub current_job: Option<JobId>,
    /// Set once shutdown was requested; no more dequeues.
    pub draining: bool,
    /// A busy-backoff poll is already scheduled.
    retry_pending: bool,
    ctx: WorkerContext,
}

impl WorkerActorState {
    /// Check if the worker is idle.
    pub fn is_idle(&self) -> bool {
        self.current_job.is_none()
    }
}

/// Sends `JobDone` when the job task ends, even if it panicked.
struct JobDoneGuard {
    worker: ActorRef<WorkerMessage>,
    job_id: JobId,
}

impl Drop for JobDoneGuard {
    fn drop(&mut self) {
        let _ = self.worker.send_message(WorkerMessage::JobDone {
            job_id: self.job_id,
        });
    }
}

/// Worker actor that executes jobs.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(worker = %args.worker_id, "Starting worker");

        let delay = args.ctx.settings.startup_delay;
        if delay.is_zero() {
            myself.send_message(WorkerMessage::Poll)?;
        } else {
            myself.send_after(delay, || WorkerMessage::Poll);
        }

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            current_job: None,
            draining: false,
            retry_pending: false,
            ctx: args.ctx,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Poll => {
                state.retry_pending = false;
                if state.draining {
                    return Ok(());
                }

                if !state.is_idle() {
                    state.retry_pending = true;
                    myself.send_after(state.ctx.settings.busy_backoff, || WorkerMessage::Poll);
                    return Ok(());
                }

                let next = state.ctx.queue.dequeue().await;
                match next {
                    Ok(Some(job)) => start_job(&myself, state, job),
                    Ok(None) => {
                        tracing::debug!(worker = %state.worker_id, "No jobs available");
                        myself.send_after(state.ctx.settings.poll_interval, || WorkerMessage::Poll);
                    }
                    Err(e) => {
                        tracing::warn!(worker = %state.worker_id, error = %e, "Dequeue failed");
                        myself.send_after(state.ctx.settings.poll_interval, || WorkerMessage::Poll);
                    }
                }
            }

            WorkerMessage::JobDone { job_id } => {
                if state.current_job == Some(job_id) {
                    state.current_job = None;
                }
                state.ctx.metrics.job_abandoned(job_id);

                if state.draining {
                    tracing::info!(worker = %state.worker_id, "In-flight job done, stopping worker");
                    myself.stop(None);
                } else if !state.retry_pending {
                    myself.send_message(WorkerMessage::Poll)?;
                }
            }

            WorkerMessage::IsIdle { reply } => {
                let _ = reply.send(state.is_idle());
            }

            WorkerMessage::Shutdown => {
                tracing::info!(worker = %state.worker_id, idle = state.is_idle(), "Shutting down worker");
                state.draining = true;
                if state.is_idle() {
                    myself.stop(None);
                }
            }
        }

        Ok(())
    }
}

fn start_job(myself: &ActorRef<WorkerMessage>, state: &mut WorkerActorState, job: Job) {
    let job_id = job.request_id;
    state.current_job = Some(job_id);
    state.ctx.metrics.job_started(job_id);

    let guard = JobDoneGuard {
        worker: myself.clone(),
        job_id,
    };
    let ctx = state.ctx.clone();
    let worker_id = state.worker_id.clone();

    tokio::spawn(async move {
        let _guard = guard;
        run_job(&ctx, &worker_id, job).await;
    });
}

async fn run_job(ctx: &WorkerContext, worker_id: &str, job: Job) {
    let job_id = job.request_id;
    let started = Instant::now();

    tracing::info!(
        worker = %worker_id,
        request_id = %job_id,
        direction = %job.direction,
        job_type = %job.job_type,
        "Starting job"
    );

    let outcome = process_job(ctx, &job).await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(result_url) => {
            ctx.metrics.record_success(job_id, elapsed);
            tracing::info!(
                worker = %worker_id,
                request_id = %job_id,
                duration_ms = elapsed.as_millis() as u64,
                result_url = %result_url,
                "Finished job"
            );
        }
        Err(error) => {
            if let Err(e) = ctx.store.update(job_id, JobUpdate::failed()).await {
                tracing::warn!(request_id = %job_id, error = %e, "Could not mark job failed");
            }
            tracing::error!(
                worker = %worker_id,
                request_id = %job_id,
                duration_ms = elapsed.as_millis() as u64,
                error = %error,
                "Failed job"
            );
            ctx.metrics.record_failure(job_id, elapsed, error);
        }
    }
}

async fn process_job(ctx: &WorkerContext, job: &Job) -> Result<String, String> {
    let job_id = job.request_id;

    ctx.store
        .update(job_id, JobUpdate::processing())
        .await
        .map_err(|e| format!("could not mark job processing: {}", e))?;

    let work = ctx.processor.process(job);
    let result = match ctx.settings.job_timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or(Err(ProcessError::TimedOut(limit))),
        None => work.await,
    };
    let result_url = result.map_err(|e| e.to_string())?;

    ctx.store
        .update(job_id, JobUpdate::finished(result_url.clone()))
        .await
        .map_err(|e| format!("could not mark job finished: {}", e))?;

    Ok(result_url)
}

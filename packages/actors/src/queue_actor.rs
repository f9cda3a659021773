//! Queue actor holding the scheduler's FIFO of pending jobs.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pipeline_core::{Job, JobId, JobQueue, QueueError, SchedulerStatus};
use ractor::rpc::CallResult;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};

use crate::messages::QueueMessage;

/// How long a caller waits for the queue actor to answer.
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// State for the queue actor.
pub struct QueueActorState {
    /// Pending jobs, head first.
    pending: VecDeque<Job>,
    total_enqueued: u64,
    total_dequeued: u64,
    last_dequeued: Option<JobId>,
    started_at: Instant,
}

impl QueueActorState {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            total_enqueued: 0,
            total_dequeued: 0,
            last_dequeued: None,
            started_at: Instant::now(),
        }
    }

    fn enqueue(&mut self, job: Job) -> Result<Job, QueueError> {
        job.check_invariants().map_err(QueueError::Rejected)?;

        if self.pending.iter().any(|j| j.request_id == job.request_id) {
            return Err(QueueError::Rejected(format!(
                "job {} is already queued",
                job.request_id
            )));
        }

        self.pending.push_back(job.clone());
        self.total_enqueued += 1;
        Ok(job)
    }

    fn dequeue(&mut self) -> Option<Job> {
        let job = self.pending.pop_front()?;
        self.total_dequeued += 1;
        self.last_dequeued = Some(job.request_id);
        Some(job)
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            total_jobs_enqueued: self.total_enqueued,
            total_jobs_dequeued: self.total_dequeued,
            last_dequeued_job_id: self.last_dequeued,
            queue_length: self.pending.len(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for QueueActorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue actor. Messages are handled one at a time, so each job is handed
/// to exactly one dequeuing caller.
pub struct QueueActor;

impl Actor for QueueActor {
    type Msg = QueueMessage;
    type State = QueueActorState;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting queue actor");
        Ok(QueueActorState::new())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            QueueMessage::Enqueue { job, reply } => {
                let request_id = job.request_id;
                let result = state.enqueue(*job);
                match &result {
                    Ok(_) => tracing::info!(
                        request_id = %request_id,
                        queue_length = state.pending.len(),
                        "Job enqueued"
                    ),
                    Err(e) => tracing::warn!(request_id = %request_id, error = %e, "Enqueue rejected"),
                }
                let _ = reply.send(result);
            }

            QueueMessage::Dequeue { reply } => {
                let job = state.dequeue();
                match &job {
                    Some(job) => tracing::info!(
                        request_id = %job.request_id,
                        queue_length = state.pending.len(),
                        "Job dequeued"
                    ),
                    None => tracing::debug!("Dequeue on empty queue"),
                }
                let _ = reply.send(job);
            }

            QueueMessage::Snapshot { reply } => {
                let _ = reply.send(state.pending.iter().cloned().collect());
            }

            QueueMessage::Len { reply } => {
                let _ = reply.send(state.pending.len());
            }

            QueueMessage::GetStatus { reply } => {
                let _ = reply.send(state.status());
            }

            QueueMessage::Shutdown => {
                tracing::info!(
                    queue_length = state.pending.len(),
                    "Shutting down queue actor"
                );
                myself.stop(None);
            }
        }

        Ok(())
    }
}

/// Cloneable handle to a running queue actor.
#[derive(Clone)]
pub struct QueueHandle {
    actor: ActorRef<QueueMessage>,
}

impl QueueHandle {
    pub fn new(actor: ActorRef<QueueMessage>) -> Self {
        Self { actor }
    }

    async fn call<T, F>(&self, build: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(RpcReplyPort<T>) -> QueueMessage,
    {
        match ractor::rpc::call(&self.actor, build, Some(CALL_TIMEOUT)).await {
            Ok(CallResult::Success(value)) => Ok(value),
            Ok(CallResult::Timeout) => Err(QueueError::Unavailable("queue actor timed out".into())),
            Ok(CallResult::SenderError) => {
                Err(QueueError::Unavailable("queue actor dropped the reply".into()))
            }
            Err(e) => Err(QueueError::Unavailable(format!("queue actor unreachable: {}", e))),
        }
    }

    /// Queued jobs in FIFO order, without removing them.
    pub async fn snapshot(&self) -> Result<Vec<Job>, QueueError> {
        self.call(|reply| QueueMessage::Snapshot { reply }).await
    }

    /// Enqueue/dequeue counters.
    pub async fn status(&self) -> Result<SchedulerStatus, QueueError> {
        self.call(|reply| QueueMessage::GetStatus { reply }).await
    }

    /// Ask the actor to stop.
    pub fn shutdown(&self) {
        let _ = self.actor.send_message(QueueMessage::Shutdown);
    }
}

impl JobQueue for QueueHandle {
    fn enqueue(&self, job: Job) -> BoxFuture<'_, Result<Job, QueueError>> {
        async move {
            self.call(|reply| QueueMessage::Enqueue {
                job: Box::new(job),
                reply,
            })
            .await?
        }
        .boxed()
    }

    fn dequeue(&self) -> BoxFuture<'_, Result<Option<Job>, QueueError>> {
        async move { self.call(|reply| QueueMessage::Dequeue { reply }).await }.boxed()
    }

    fn len(&self) -> BoxFuture<'_, Result<usize, QueueError>> {
        async move { self.call(|reply| QueueMessage::Len { reply }).await }.boxed()
    }
}

/// Spawn a queue actor and return a handle to it.
pub async fn start_queue()
-> Result<(QueueHandle, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    let (actor, handle) = Actor::spawn(None, QueueActor, ()).await?;
    Ok((QueueHandle::new(actor), handle))
}

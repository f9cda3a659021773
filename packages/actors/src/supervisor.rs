//! Supervisor actor owning the worker pool.

use std::collections::HashMap;

use ractor::{Actor, ActorId, ActorProcessingErr, ActorRef, SupervisionEvent};

use crate::messages::{SupervisorMessage, WorkerMessage};
use crate::worker_actor::{WorkerActor, WorkerArgs, WorkerContext};

/// Supervisor actor arguments.
pub struct SupervisorArgs {
    /// Number of workers to keep alive.
    pub workers: usize,
    pub ctx: WorkerContext,
}

/// State for the supervisor actor.
pub struct SupervisorState {
    ctx: WorkerContext,
    /// Live workers by actor ID.
    workers: HashMap<ActorId, (String, ActorRef<WorkerMessage>)>,
    /// Worker counter for unique IDs.
    worker_counter: u64,
    draining: bool,
}

impl SupervisorState {
    fn new(ctx: WorkerContext) -> Self {
        Self {
            ctx,
            workers: HashMap::new(),
            worker_counter: 0,
            draining: false,
        }
    }

    /// Generate a unique worker ID.
    fn next_worker_id(&mut self) -> String {
        self.worker_counter += 1;
        format!("worker-{}", self.worker_counter)
    }
}

async fn spawn_worker(
    myself: &ActorRef<SupervisorMessage>,
    state: &mut SupervisorState,
) -> Result<(), ActorProcessingErr> {
    let worker_id = state.next_worker_id();
    let args = WorkerArgs {
        worker_id: worker_id.clone(),
        ctx: state.ctx.clone(),
    };

    let (actor, _handle) = Actor::spawn_linked(None, WorkerActor, args, myself.get_cell())
        .await
        .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn worker: {}", e)))?;

    state.workers.insert(actor.get_id(), (worker_id, actor));
    state.ctx.metrics.set_workers(state.workers.len());
    Ok(())
}

/// Supervisor actor that keeps the worker pool alive and drains it on shutdown.
pub struct Supervisor;

impl Actor for Supervisor {
    type Msg = SupervisorMessage;
    type State = SupervisorState;
    type Arguments = SupervisorArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(workers = args.workers, "Starting worker supervisor");

        let mut state = SupervisorState::new(args.ctx);
        for _ in 0..args.workers {
            spawn_worker(&myself, &mut state).await?;
        }

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMessage::WorkerCount { reply } => {
                let _ = reply.send(state.workers.len());
            }

            SupervisorMessage::Shutdown => {
                tracing::info!(workers = state.workers.len(), "Draining workers");
                state.draining = true;
                for (_, worker) in state.workers.values() {
                    let _ = worker.send_message(WorkerMessage::Shutdown);
                }
                if state.workers.is_empty() {
                    myself.stop(None);
                }
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorFailed(cell, error) => {
                if let Some((worker_id, _)) = state.workers.remove(&cell.get_id()) {
                    tracing::warn!(worker = %worker_id, error = %error, "Worker failed");
                    if !state.draining {
                        tracing::warn!(worker = %worker_id, "Restarting worker");
                        spawn_worker(&myself, state).await?;
                    }
                }
            }
            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                if let Some((worker_id, _)) = state.workers.remove(&cell.get_id()) {
                    tracing::info!(worker = %worker_id, reason = ?reason, "Worker stopped");
                }
            }
            _ => {}
        }

        state.ctx.metrics.set_workers(state.workers.len());
        if state.draining && state.workers.is_empty() {
            tracing::info!("All workers drained");
            myself.stop(None);
        }
        Ok(())
    }
}

/// Start the supervisor with `workers` pool members.
pub async fn start_supervisor(
    workers: usize,
    ctx: WorkerContext,
) -> Result<(ActorRef<SupervisorMessage>, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    Actor::spawn(None, Supervisor, SupervisorArgs { workers, ctx }).await
}

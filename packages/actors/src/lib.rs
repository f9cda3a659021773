//! Actor system for the job pipeline.
//!
//! This crate provides the Ractor-based actors behind the scheduler
//! and the handler.
//!
//! # Architecture
//!
//! - `QueueActor` - The scheduler's FIFO queue and its counters
//! - `Supervisor` - Owns the worker pool, restarts failed workers, drains on shutdown
//! - `WorkerActor` - Polls the queue and processes one job at a time
//!
//! # Usage
//!
//! ```ignore
//! use actors::{start_queue, start_supervisor, WorkerContext};
//!
//! let (queue, _) = start_queue().await?;
//! let (supervisor, handle) = start_supervisor(1, ctx).await?;
//!
//! supervisor.send_message(SupervisorMessage::Shutdown)?;
//! handle.await?;
//! ```

mod messages;
mod metrics;
mod processor;
mod queue_actor;
mod supervisor;
mod worker_actor;

pub use messages::{QueueMessage, SupervisorMessage, WorkerMessage};
pub use metrics::WorkerMetrics;
pub use processor::{
    JobProcessor, ProcessFuture, ProcessResult, ProcessingProfile, SimulatedProcessor,
};
pub use queue_actor::{QueueActor, QueueHandle, start_queue};
pub use supervisor::{Supervisor, SupervisorArgs, start_supervisor};
pub use worker_actor::{WorkerActor, WorkerArgs, WorkerContext, WorkerSettings};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, SpawnErr, concurrency};

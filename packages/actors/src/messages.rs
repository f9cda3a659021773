//! Message types for actor communication.

use pipeline_core::{Job, JobId, QueueError, SchedulerStatus};
use ractor::RpcReplyPort;

/// Messages for the QueueActor.
#[derive(Debug)]
pub enum QueueMessage {
    /// Append a job to the tail of the queue.
    Enqueue {
        job: Box<Job>,
        reply: RpcReplyPort<Result<Job, QueueError>>,
    },

    /// Remove and return the head of the queue, `None` when empty.
    Dequeue { reply: RpcReplyPort<Option<Job>> },

    /// Snapshot of the queued jobs in FIFO order.
    Snapshot { reply: RpcReplyPort<Vec<Job>> },

    /// Current queue length.
    Len { reply: RpcReplyPort<usize> },

    /// Enqueue/dequeue counters.
    GetStatus { reply: RpcReplyPort<SchedulerStatus> },

    /// Stop the queue actor.
    Shutdown,
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Try to take the next job from the queue.
    Poll,

    /// The in-flight job is done, whatever its outcome.
    JobDone { job_id: JobId },

    /// Check if worker is idle.
    IsIdle { reply: RpcReplyPort<bool> },

    /// Stop polling, finish the in-flight job, then stop.
    Shutdown,
}

/// Messages for the Supervisor.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Number of live workers.
    WorkerCount { reply: RpcReplyPort<usize> },

    /// Drain every worker, then stop.
    Shutdown,
}

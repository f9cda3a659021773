//! Narrow contracts for the two shared mutable resources: the job store and the queue.
//!
//! Services hold these as `Arc<dyn ...>` so the same code runs against in-process
//! implementations or HTTP clients on the other side of a network boundary.

use futures_util::future::BoxFuture;

use crate::error::{QueueError, StoreError};
use crate::{Direction, Job, JobId, JobUpdate};

/// CRUD repository of job records keyed by request ID.
///
/// Reads hand out owned copies; only `update` changes stored state.
pub trait JobStore: Send + Sync + 'static {
    /// Insert a new record. Fails with `DuplicateKey` if the ID is taken.
    fn insert(&self, job: Job) -> BoxFuture<'_, Result<Job, StoreError>>;

    /// Merge a partial update into an existing record and bump `updatedAt`.
    fn update(&self, id: JobId, update: JobUpdate) -> BoxFuture<'_, Result<Job, StoreError>>;

    fn find_by_id(&self, id: JobId) -> BoxFuture<'_, Result<Job, StoreError>>;

    /// Records for one direction, in insertion order.
    fn find_by_direction(&self, direction: Direction) -> BoxFuture<'_, Result<Vec<Job>, StoreError>>;

    /// All records, in insertion order.
    fn find_all(&self) -> BoxFuture<'_, Result<Vec<Job>, StoreError>>;

    /// Remove every record. Reset path only.
    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Strict FIFO queue of job snapshots.
pub trait JobQueue: Send + Sync + 'static {
    /// Append a job snapshot to the tail.
    fn enqueue(&self, job: Job) -> BoxFuture<'_, Result<Job, QueueError>>;

    /// Atomically remove the head. `Ok(None)` means the queue is empty.
    fn dequeue(&self) -> BoxFuture<'_, Result<Option<Job>, QueueError>>;

    fn len(&self) -> BoxFuture<'_, Result<usize, QueueError>>;
}

//! Core domain types for the job pipeline.
//!
//! This crate is the one canonical schema every service consumes:
//! - Job, JobState, Direction and JobType for job records
//! - JobUpdate for the worker's partial updates
//! - Submission validation with per-direction type allowlists
//! - Status snapshots and the shared error taxonomy
//! - The JobStore and JobQueue ports

mod error;
mod job;
mod ports;
mod request;
mod status;

pub use error::{FieldError, ProcessError, QueueError, StoreError, ValidationErrors};
pub use job::{Direction, Job, JobId, JobState, JobType, JobUpdate};
pub use ports::{JobQueue, JobStore};
pub use request::{SubmitRequest, SubmitResponse, TypeAllowlist};
pub use status::{HealthResponse, SchedulerStatus, WorkerStatus};

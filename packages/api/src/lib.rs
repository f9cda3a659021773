//! HTTP services for the job pipeline.
//!
//! This crate contains the axum routers and the service wiring for:
//! - Receptionist (submit and list export/import jobs)
//! - Task registry (persisted job records)
//! - Scheduler (the FIFO job queue)
//! - Handler (worker pool status)
//!
//! It also provides HTTP clients that let a service reach the registry and
//! scheduler when they run in another process.

mod clients;
mod config;
mod error;
mod handler;
mod health;
mod init;
mod receptionist;
mod registry;
mod scheduler;

#[cfg(test)]
mod test_support;

pub use clients::{ClientError, RegistryClient, SchedulerClient};
pub use config::{PipelineConfig, Role};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use init::{InitError, Pipeline};
pub use receptionist::{JobsByState, Receptionist, SubmitError};

/// Router constructors for running a single service.
pub mod routers {
    pub use crate::handler::router as handler;
    pub use crate::receptionist::router as receptionist;
    pub use crate::registry::router as registry;
    pub use crate::scheduler::router as scheduler;
}

// Re-export core types for convenience
pub use pipeline_core::{
    Direction, Job, JobId, JobState, JobType, JobUpdate, SubmitRequest, SubmitResponse,
    TypeAllowlist,
};

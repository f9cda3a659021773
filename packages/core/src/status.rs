//! Read-only status snapshots exposed by the scheduler and the handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Counters kept by the scheduler's queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub total_jobs_enqueued: u64,
    pub total_jobs_dequeued: u64,
    pub last_dequeued_job_id: Option<JobId>,
    pub queue_length: usize,
    pub uptime_seconds: u64,
}

/// Counters kept by the handler's worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    pub is_idle: bool,
    pub workers: usize,
    pub jobs_in_flight: usize,
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub current_job: Option<JobId>,
    pub last_job_id: Option<JobId>,
    pub last_job_duration_ms: u64,
    pub last_job_error: Option<String>,
    pub last_job_success: Option<DateTime<Utc>>,
}

/// Body of every `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok(service: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_status_uses_camel_case() {
        let json = serde_json::to_value(SchedulerStatus::default()).unwrap();
        assert_eq!(json["totalJobsEnqueued"], 0);
        assert_eq!(json["queueLength"], 0);
        assert!(json["lastDequeuedJobId"].is_null());
    }

    #[test]
    fn worker_status_uses_camel_case() {
        let json = serde_json::to_value(WorkerStatus::default()).unwrap();
        assert_eq!(json["jobsInFlight"], 0);
        assert_eq!(json["lastJobDurationMs"], 0);
        assert!(json["lastJobSuccess"].is_null());
    }
}

//! Counters shared by every worker in the pool.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pipeline_core::{JobId, WorkerStatus};

#[derive(Debug, Default)]
struct LastJob {
    in_flight: Vec<JobId>,
    id: Option<JobId>,
    duration_ms: u64,
    error: Option<String>,
    success_at: Option<DateTime<Utc>>,
}

/// Worker pool metrics. Updated by workers, read as one `WorkerStatus` snapshot.
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    workers: AtomicUsize,
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    last: Mutex<LastJob>,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn last(&self) -> std::sync::MutexGuard<'_, LastJob> {
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set_workers(&self, count: usize) {
        self.workers.store(count, Ordering::SeqCst);
    }

    pub(crate) fn job_started(&self, id: JobId) {
        self.last().in_flight.push(id);
    }

    pub(crate) fn record_success(&self, id: JobId, duration: Duration) {
        self.processed.fetch_add(1, Ordering::SeqCst);
        self.succeeded.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last();
        last.in_flight.retain(|j| *j != id);
        last.id = Some(id);
        last.duration_ms = duration.as_millis() as u64;
        last.error = None;
        last.success_at = Some(Utc::now());
    }

    pub(crate) fn record_failure(&self, id: JobId, duration: Duration, error: impl Into<String>) {
        self.processed.fetch_add(1, Ordering::SeqCst);
        self.failed.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last();
        last.in_flight.retain(|j| *j != id);
        last.id = Some(id);
        last.duration_ms = duration.as_millis() as u64;
        last.error = Some(error.into());
    }

    /// Drop a job from the in-flight list without counting it.
    pub(crate) fn job_abandoned(&self, id: JobId) {
        self.last().in_flight.retain(|j| *j != id);
    }

    pub fn snapshot(&self) -> WorkerStatus {
        let last = self.last();
        WorkerStatus {
            is_idle: last.in_flight.is_empty(),
            workers: self.workers.load(Ordering::SeqCst),
            jobs_in_flight: last.in_flight.len(),
            jobs_processed: self.processed.load(Ordering::SeqCst),
            jobs_succeeded: self.succeeded.load(Ordering::SeqCst),
            jobs_failed: self.failed.load(Ordering::SeqCst),
            current_job: last.in_flight.first().copied(),
            last_job_id: last.id,
            last_job_duration_ms: last.duration_ms,
            last_job_error: last.error.clone(),
            last_job_success: last.success_at,
        }
    }
}

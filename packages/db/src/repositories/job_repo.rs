//! Job repository for CRUD operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pipeline_core::{Direction, Job, JobId, JobStore, JobUpdate, StoreError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{Database, DbError};

const TABLE: &str = "job";

/// Repository for job persistence operations.
///
/// Clones share the same connection, sequence counter and write lock.
#[derive(Clone)]
pub struct JobRepository {
    db: Database,
    last_seq: Arc<AtomicI64>,
    write_lock: Arc<Mutex<()>>,
}

/// Row stored in the `job` table. Every value is a plain string or integer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRow {
    seq: i64,
    request_id: String,
    book_id: String,
    direction: String,
    #[serde(rename = "type")]
    job_type: String,
    state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result_url: Option<String>,
    created_at: String,
    updated_at: String,
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::Query(format!("Invalid timestamp '{}': {}", raw, e)))
}

impl JobRow {
    fn from_job(job: &Job, seq: i64) -> Self {
        Self {
            seq,
            request_id: job.request_id.to_string(),
            book_id: job.book_id.clone(),
            direction: job.direction.as_str().to_string(),
            job_type: job.job_type.as_str().to_string(),
            state: job.state.as_str().to_string(),
            source_url: job.source_url.clone(),
            result_url: job.result_url.clone(),
            created_at: format_time(&job.created_at),
            updated_at: format_time(&job.updated_at),
        }
    }

    fn into_job(self) -> Result<Job, DbError> {
        let corrupt = |field: &str, e: String| DbError::Query(format!("Corrupt {}: {}", field, e));

        Ok(Job {
            request_id: JobId::parse(&self.request_id)
                .map_err(|e| corrupt("requestId", e.to_string()))?,
            book_id: self.book_id,
            direction: self.direction.parse().map_err(|e| corrupt("direction", e))?,
            job_type: self.job_type.parse().map_err(|e| corrupt("type", e))?,
            state: self.state.parse().map_err(|e| corrupt("state", e))?,
            source_url: self.source_url,
            result_url: self.result_url,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

impl JobRepository {
    /// Create a repository on an initialized database.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            last_seq: Arc::new(AtomicI64::new(0)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Next insertion sequence number: wall-clock nanos, strictly increasing.
    fn next_seq(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let prev = self
            .last_seq
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }

    async fn select_row(&self, id: JobId) -> Result<Option<JobRow>, DbError> {
        let row: Option<JobRow> = self.db.select((TABLE, id.to_string())).await?;
        Ok(row)
    }

    /// Insert a new job.
    pub async fn insert(&self, job: &Job) -> Result<Job, DbError> {
        let _guard = self.write_lock.lock().await;

        if self.select_row(job.request_id).await?.is_some() {
            return Err(StoreError::DuplicateKey(job.request_id).into());
        }

        let row = JobRow::from_job(job, self.next_seq());
        let created: Option<JobRow> = self
            .db
            .create((TABLE, job.request_id.to_string()))
            .content(row)
            .await?;

        tracing::debug!(request_id = %job.request_id, "Inserted job record");

        created
            .ok_or_else(|| DbError::Query("Failed to create job".into()))?
            .into_job()
    }

    /// Merge a partial update into a job.
    pub async fn update(&self, id: JobId, update: &JobUpdate) -> Result<Job, DbError> {
        let _guard = self.write_lock.lock().await;

        let row = self
            .select_row(id)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        let seq = row.seq;

        let mut job = row.into_job()?;
        job.apply(update)?;

        let updated: Option<JobRow> = self
            .db
            .update((TABLE, id.to_string()))
            .content(JobRow::from_job(&job, seq))
            .await?;

        tracing::debug!(request_id = %id, state = %job.state, "Updated job record");

        updated.ok_or(StoreError::NotFound(id))?.into_job()
    }

    /// Get a job by ID.
    pub async fn get(&self, id: JobId) -> Result<Job, DbError> {
        self.select_row(id)
            .await?
            .ok_or(StoreError::NotFound(id))?
            .into_job()
    }

    /// List jobs for one direction in insertion order.
    pub async fn list_by_direction(&self, direction: Direction) -> Result<Vec<Job>, DbError> {
        let mut response = self
            .db
            .query("SELECT * FROM job WHERE direction = $direction ORDER BY seq ASC")
            .bind(("direction", direction.as_str()))
            .await?;

        let rows: Vec<JobRow> = response.take(0)?;
        rows.into_iter().map(JobRow::into_job).collect()
    }

    /// List all jobs in insertion order.
    pub async fn list(&self) -> Result<Vec<Job>, DbError> {
        let mut response = self.db.query("SELECT * FROM job ORDER BY seq ASC").await?;

        let rows: Vec<JobRow> = response.take(0)?;
        rows.into_iter().map(JobRow::into_job).collect()
    }

    /// Delete every job.
    pub async fn clear(&self) -> Result<(), DbError> {
        let _guard = self.write_lock.lock().await;
        self.db.query("DELETE job").await?.check()?;
        tracing::info!("Cleared all job records");
        Ok(())
    }
}

impl JobStore for JobRepository {
    fn insert(&self, job: Job) -> BoxFuture<'_, Result<Job, StoreError>> {
        async move { Ok(JobRepository::insert(self, &job).await?) }.boxed()
    }

    fn update(&self, id: JobId, update: JobUpdate) -> BoxFuture<'_, Result<Job, StoreError>> {
        async move { Ok(JobRepository::update(self, id, &update).await?) }.boxed()
    }

    fn find_by_id(&self, id: JobId) -> BoxFuture<'_, Result<Job, StoreError>> {
        async move { Ok(self.get(id).await?) }.boxed()
    }

    fn find_by_direction(
        &self,
        direction: Direction,
    ) -> BoxFuture<'_, Result<Vec<Job>, StoreError>> {
        async move { Ok(self.list_by_direction(direction).await?) }.boxed()
    }

    fn find_all(&self) -> BoxFuture<'_, Result<Vec<Job>, StoreError>> {
        async move { Ok(self.list().await?) }.boxed()
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        async move { Ok(JobRepository::clear(self).await?) }.boxed()
    }
}

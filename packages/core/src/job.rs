//! Job domain types shared by every service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Unique identifier for a job request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a new random (v4) job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a job brings content into the system or takes it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Import,
    Export,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Import => "import",
            Direction::Export => "export",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "import" => Ok(Direction::Import),
            "export" => Ok(Direction::Export),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Document format a job reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Epub,
    Pdf,
    Word,
    Wattpad,
    Evernote,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::Epub,
        JobType::Pdf,
        JobType::Word,
        JobType::Wattpad,
        JobType::Evernote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Epub => "epub",
            JobType::Pdf => "pdf",
            JobType::Word => "word",
            JobType::Wattpad => "wattpad",
            JobType::Evernote => "evernote",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown job type '{}'", s))
    }
}

/// Lifecycle stage of a job.
///
/// Variant order is lifecycle order, so `Ord` sorts pending jobs first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created and waiting in the queue.
    #[default]
    Pending,
    /// Picked up by a worker.
    Processing,
    /// Completed with a result reference.
    Finished,
    /// Terminated without a result.
    Failed,
}

impl JobState {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    /// Whether moving from `self` to `next` walks the lifecycle forward.
    ///
    /// `Pending -> Failed` is allowed for jobs that could not be started.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Processing)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Processing, JobState::Finished)
                | (JobState::Processing, JobState::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "finished" => Ok(JobState::Finished),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state '{}'", other)),
        }
    }
}

/// A job record, as persisted by the registry and carried through the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub request_id: JobId,
    pub book_id: String,
    pub direction: Direction,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job with a fresh request ID.
    pub fn new(book_id: impl Into<String>, direction: Direction, job_type: JobType) -> Self {
        let now = Utc::now();
        Self {
            request_id: JobId::new(),
            book_id: book_id.into(),
            direction,
            job_type,
            state: JobState::Pending,
            source_url: None,
            result_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the source URL (import jobs).
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Check the record-level invariants of a job body received from outside.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.book_id.trim().is_empty() {
            return Err("bookId must not be empty".into());
        }
        match (self.state, &self.result_url) {
            (JobState::Finished, None) => Err("finished job must carry a resultUrl".into()),
            (state, Some(_)) if state != JobState::Finished => {
                Err(format!("resultUrl is only allowed on finished jobs, not {}", state))
            }
            _ => Ok(()),
        }
    }

    /// Merge a partial update into this job, enforcing the lifecycle rules.
    ///
    /// On error the job is left untouched.
    pub fn apply(&mut self, update: &JobUpdate) -> Result<(), StoreError> {
        if update.state.is_none() && update.result_url.is_none() {
            return Err(StoreError::InvalidUpdate("update carries no fields".into()));
        }

        let next = update.state.unwrap_or(self.state);

        if self.state.is_terminal()
            || (update.state.is_some() && !self.state.can_transition_to(next))
        {
            return Err(StoreError::InvalidTransition {
                id: self.request_id,
                from: self.state,
                to: next,
            });
        }

        let result_url = match (&update.result_url, next) {
            (Some(url), JobState::Finished) if !url.trim().is_empty() => Some(url.clone()),
            (Some(_), JobState::Finished) => {
                return Err(StoreError::InvalidUpdate("resultUrl must not be empty".into()));
            }
            (None, JobState::Finished) => {
                return Err(StoreError::InvalidUpdate(
                    "resultUrl is required when a job finishes".into(),
                ));
            }
            (Some(_), state) => {
                return Err(StoreError::InvalidUpdate(format!(
                    "resultUrl is only allowed on finished jobs, not {}",
                    state
                )));
            }
            (None, _) => self.result_url.clone(),
        };

        self.state = next;
        self.result_url = result_url;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial update of a job record. Only the worker sends these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

impl JobUpdate {
    pub fn processing() -> Self {
        Self {
            state: Some(JobState::Processing),
            result_url: None,
        }
    }

    pub fn finished(result_url: impl Into<String>) -> Self {
        Self {
            state: Some(JobState::Finished),
            result_url: Some(result_url.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            state: Some(JobState::Failed),
            result_url: None,
        }
    }
}

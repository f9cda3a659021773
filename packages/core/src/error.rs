//! Error taxonomy shared across the pipeline services.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Direction, JobId, JobState, JobType};

/// Errors raised by a job record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already exists: {0}")]
    DuplicateKey(JobId),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a job queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Queue rejected job: {0}")]
    Rejected(String),

    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

/// Processing-time classification failures. Terminal for the job only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("Unsupported job direction: {0}")]
    UnsupportedDirection(Direction),

    #[error("Unsupported job type {job_type} for {direction}")]
    UnsupportedType {
        direction: Direction,
        job_type: JobType,
    },

    #[error("Job timed out after {0:?}")]
    TimedOut(Duration),
}

/// A single user-correctable problem with a request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All validation problems found in one request. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", first_issue(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn first_issue(issues: &[FieldError]) -> String {
    match issues {
        [] => "invalid request".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

impl ValidationErrors {
    pub fn issues(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether any issue concerns `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|issue| issue.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_the_first_field() {
        let errors = ValidationErrors(vec![
            FieldError::new("type", "must be one of: epub, pdf"),
            FieldError::new("bookId", "is required"),
        ]);
        assert_eq!(
            errors.to_string(),
            "type: must be one of: epub, pdf (and 1 more)"
        );
        assert!(errors.mentions("bookId"));
        assert!(!errors.mentions("url"));
    }

    #[test]
    fn sub_second_timeouts_keep_their_precision() {
        let err = ProcessError::TimedOut(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Job timed out after 250ms");
    }

    #[test]
    fn store_error_messages() {
        let id = JobId::new();
        let err = StoreError::InvalidTransition {
            id,
            from: JobState::Finished,
            to: JobState::Processing,
        };
        assert_eq!(
            err.to_string(),
            format!("Job {} cannot move from finished to processing", id)
        );
    }
}

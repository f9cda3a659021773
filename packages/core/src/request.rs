//! Submission requests and their validation.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FieldError, ValidationErrors};
use crate::{Direction, Job, JobType};

/// Body of `POST /exports` and `POST /imports`.
///
/// Fields are kept as raw strings so validation can report each one by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub book_id: Option<String>,
    #[serde(default, rename = "type")]
    pub job_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl SubmitRequest {
    pub fn export(book_id: impl Into<String>, job_type: impl Into<String>) -> Self {
        Self {
            book_id: Some(book_id.into()),
            job_type: Some(job_type.into()),
            url: None,
        }
    }

    pub fn import(
        book_id: impl Into<String>,
        job_type: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            book_id: Some(book_id.into()),
            job_type: Some(job_type.into()),
            url: Some(url.into()),
        }
    }
}

/// Response of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: crate::JobId,
}

/// Which job types each direction accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAllowlist {
    pub import: Vec<JobType>,
    pub export: Vec<JobType>,
}

impl Default for TypeAllowlist {
    fn default() -> Self {
        Self {
            import: vec![
                JobType::Word,
                JobType::Pdf,
                JobType::Wattpad,
                JobType::Evernote,
            ],
            export: vec![JobType::Epub, JobType::Pdf],
        }
    }
}

impl TypeAllowlist {
    pub fn for_direction(&self, direction: Direction) -> &[JobType] {
        match direction {
            Direction::Import => &self.import,
            Direction::Export => &self.export,
        }
    }

    pub fn allows(&self, direction: Direction, job_type: JobType) -> bool {
        self.for_direction(direction).contains(&job_type)
    }

    fn describe(&self, direction: Direction) -> String {
        self.for_direction(direction)
            .iter()
            .map(JobType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Validate a submission and build the pending job it describes.
    ///
    /// Has no side effects; every problem found is reported.
    pub fn validate(
        &self,
        request: &SubmitRequest,
        direction: Direction,
    ) -> Result<Job, ValidationErrors> {
        let mut issues = Vec::new();

        let book_id = match request.book_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            Some(_) => {
                issues.push(FieldError::new("bookId", "must not be empty"));
                None
            }
            None => {
                issues.push(FieldError::new("bookId", "is required"));
                None
            }
        };

        let job_type = match request.job_type.as_deref() {
            None => {
                issues.push(FieldError::new("type", "is required"));
                None
            }
            Some(raw) => match raw.parse::<JobType>() {
                Ok(t) if self.allows(direction, t) => Some(t),
                _ => {
                    issues.push(FieldError::new(
                        "type",
                        format!(
                            "unsupported {} type '{}', expected one of: {}",
                            direction,
                            raw,
                            self.describe(direction)
                        ),
                    ));
                    None
                }
            },
        };

        let source_url = match direction {
            Direction::Export => None,
            Direction::Import => match request.url.as_deref() {
                None => {
                    issues.push(FieldError::new("url", "is required for imports"));
                    None
                }
                Some(raw) => match validate_absolute_url(raw) {
                    Ok(url) => Some(url),
                    Err(message) => {
                        issues.push(FieldError::new("url", message));
                        None
                    }
                },
            },
        };

        match (book_id, job_type) {
            (Some(book_id), Some(job_type)) if issues.is_empty() => {
                let job = Job::new(book_id, direction, job_type);
                Ok(match source_url {
                    Some(url) => job.with_source_url(url),
                    None => job,
                })
            }
            _ => Err(ValidationErrors(issues)),
        }
    }
}

fn validate_absolute_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| format!("invalid URL: {}", e))?;
    if url.host_str().is_none() {
        return Err("URL must be absolute with a host".into());
    }
    Ok(trimmed.to_string())
}

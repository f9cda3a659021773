//! API error types and their HTTP mapping.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pipeline_core::{FieldError, QueueError, StoreError, ValidationErrors};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::receptionist::SubmitError;

/// Structured JSON error response for API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}

/// API error types that map to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id.to_string()),
            StoreError::DuplicateKey(_) | StoreError::InvalidTransition { .. } => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::InvalidUpdate(msg) => ApiError::BadRequest(msg),
            StoreError::Unavailable(msg) => ApiError::Upstream(msg),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Rejected(msg) => ApiError::BadRequest(msg),
            QueueError::Unavailable(msg) => ApiError::Upstream(msg),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(issues) => ApiError::Validation(issues),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Validation(issues) => {
                tracing::warn!(error = %issues, "Validation failed");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details(issues.to_string(), issues.issues().to_vec()),
                )
            }
            ApiError::NotFound(id) => {
                tracing::debug!(request_id = %id, "Job not found");
                (StatusCode::NOT_FOUND, ErrorResponse::new(self.to_string()))
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, ErrorResponse::new(self.to_string()))
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(message = %msg, "Conflict");
                (StatusCode::CONFLICT, ErrorResponse::new(self.to_string()))
            }
            ApiError::Upstream(msg) => {
                tracing::error!(message = %msg, "Upstream unavailable");
                (StatusCode::BAD_GATEWAY, ErrorResponse::new(self.to_string()))
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(self.to_string()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

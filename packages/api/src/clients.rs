//! HTTP clients reaching the registry and scheduler across the network.

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pipeline_core::{
    Direction, Job, JobId, JobQueue, JobStore, JobUpdate, QueueError, SchedulerStatus, StoreError,
};
use reqwest::{Response, StatusCode};
use thiserror::Error;

use crate::error::ErrorResponse;

/// Errors raised by the service clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {message}")]
    Status { status: StatusCode, message: String },
}

impl From<ClientError> for StoreError {
    fn from(err: ClientError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<ClientError> for QueueError {
    fn from(err: ClientError) -> Self {
        QueueError::Unavailable(err.to_string())
    }
}

fn build_http(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Best-effort error message from a non-success response.
async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    }
}

async fn unexpected(response: Response) -> ClientError {
    ClientError::Status {
        status: response.status(),
        message: error_message(response).await,
    }
}

/// Registry client implementing `JobStore` over HTTP.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn list(&self, direction: Option<Direction>) -> Result<Vec<Job>, StoreError> {
        let mut request = self.http.get(self.url("/jobs"));
        if let Some(direction) = direction {
            request = request.query(&[("direction", direction.as_str())]);
        }

        let response = request.send().await.map_err(ClientError::from)?;
        if response.status() != StatusCode::OK {
            return Err(unexpected(response).await.into());
        }
        Ok(response.json().await.map_err(ClientError::from)?)
    }
}

impl JobStore for RegistryClient {
    fn insert(&self, job: Job) -> BoxFuture<'_, Result<Job, StoreError>> {
        async move {
            let response = self
                .http
                .post(self.url("/jobs"))
                .json(&job)
                .send()
                .await
                .map_err(ClientError::from)?;

            match response.status() {
                StatusCode::CREATED => Ok(response.json().await.map_err(ClientError::from)?),
                StatusCode::CONFLICT => Err(StoreError::DuplicateKey(job.request_id)),
                StatusCode::BAD_REQUEST => Err(StoreError::InvalidUpdate(error_message(response).await)),
                _ => Err(unexpected(response).await.into()),
            }
        }
        .boxed()
    }

    fn update(&self, id: JobId, update: JobUpdate) -> BoxFuture<'_, Result<Job, StoreError>> {
        async move {
            let response = self
                .http
                .patch(self.url(&format!("/jobs/{}", id)))
                .json(&update)
                .send()
                .await
                .map_err(ClientError::from)?;

            match response.status() {
                StatusCode::OK => Ok(response.json().await.map_err(ClientError::from)?),
                StatusCode::NOT_FOUND => Err(StoreError::NotFound(id)),
                StatusCode::BAD_REQUEST => {
                    Err(StoreError::InvalidUpdate(error_message(response).await))
                }
                // The body only carries a message; the current state names the rejected move.
                StatusCode::CONFLICT => {
                    let current = self.find_by_id(id).await?;
                    Err(StoreError::InvalidTransition {
                        id,
                        from: current.state,
                        to: update.state.unwrap_or(current.state),
                    })
                }
                _ => Err(unexpected(response).await.into()),
            }
        }
        .boxed()
    }

    fn find_by_id(&self, id: JobId) -> BoxFuture<'_, Result<Job, StoreError>> {
        async move {
            let response = self
                .http
                .get(self.url(&format!("/jobs/{}", id)))
                .send()
                .await
                .map_err(ClientError::from)?;

            match response.status() {
                StatusCode::OK => Ok(response.json().await.map_err(ClientError::from)?),
                StatusCode::NOT_FOUND => Err(StoreError::NotFound(id)),
                _ => Err(unexpected(response).await.into()),
            }
        }
        .boxed()
    }

    fn find_by_direction(&self, direction: Direction) -> BoxFuture<'_, Result<Vec<Job>, StoreError>> {
        self.list(Some(direction)).boxed()
    }

    fn find_all(&self) -> BoxFuture<'_, Result<Vec<Job>, StoreError>> {
        self.list(None).boxed()
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let response = self
                .http
                .delete(self.url("/jobs"))
                .send()
                .await
                .map_err(ClientError::from)?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(unexpected(response).await.into())
            }
        }
        .boxed()
    }
}

/// Scheduler client implementing `JobQueue` over HTTP.
#[derive(Debug, Clone)]
pub struct SchedulerClient {
    http: reqwest::Client,
    base_url: String,
}

impl SchedulerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Queued jobs in FIFO order.
    pub async fn snapshot(&self) -> Result<Vec<Job>, ClientError> {
        let response = self.http.get(self.url("/queue")).send().await?;
        if response.status() != StatusCode::OK {
            return Err(unexpected(response).await);
        }
        Ok(response.json().await?)
    }

    /// Enqueue/dequeue counters.
    pub async fn status(&self) -> Result<SchedulerStatus, ClientError> {
        let response = self.http.get(self.url("/status")).send().await?;
        if response.status() != StatusCode::OK {
            return Err(unexpected(response).await);
        }
        Ok(response.json().await?)
    }
}

impl JobQueue for SchedulerClient {
    fn enqueue(&self, job: Job) -> BoxFuture<'_, Result<Job, QueueError>> {
        async move {
            let response = self
                .http
                .post(self.url("/queue"))
                .json(&job)
                .send()
                .await
                .map_err(ClientError::from)?;

            match response.status() {
                StatusCode::CREATED => Ok(response.json().await.map_err(ClientError::from)?),
                StatusCode::BAD_REQUEST => Err(QueueError::Rejected(error_message(response).await)),
                _ => Err(unexpected(response).await.into()),
            }
        }
        .boxed()
    }

    fn dequeue(&self) -> BoxFuture<'_, Result<Option<Job>, QueueError>> {
        async move {
            let response = self
                .http
                .post(self.url("/queue/dequeue"))
                .send()
                .await
                .map_err(ClientError::from)?;

            match response.status() {
                StatusCode::NO_CONTENT => Ok(None),
                StatusCode::OK => Ok(Some(response.json().await.map_err(ClientError::from)?)),
                _ => Err(unexpected(response).await.into()),
            }
        }
        .boxed()
    }

    fn len(&self) -> BoxFuture<'_, Result<usize, QueueError>> {
        async move { Ok(self.status().await?.queue_length) }.boxed()
    }
}

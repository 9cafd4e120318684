//! HTTP client for the external task REST endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use lockrun_core::{ExternalTask, ExternalTaskId, Identity, WorkerId};

use crate::api::ExternalTaskApi;
use crate::error::ClientError;
use crate::requests::{
    ExtendLockRequest, FetchAndLockRequest, FinishRequest, HandleBpmnErrorRequest,
    HandleServiceErrorRequest,
};

/// Route prefix of the external task API.
const API_PREFIX: &str = "api/external_task/v1";

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Process engine base URL, e.g. `http://localhost:8000`.
    pub base_url: String,

    /// Timeout applied to every request. The fetch call gets the long-poll
    /// timeout on top of this.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// [`ExternalTaskApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExternalTaskClient {
    inner: reqwest::Client,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl HttpExternalTaskClient {
    /// Create a new client from its configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(inner: reqwest::Client, config: ClientConfig) -> Self {
        Self {
            inner,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
        }
    }

    /// Build the endpoint URL. Each segment is percent-encoded, so opaque
    /// task ids cannot change the route.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{}: not a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(API_PREFIX.split('/'))
            .extend(segments);
        Ok(url)
    }

    /// POST a JSON body and fail on any non-2xx status.
    async fn post<B: Serialize + ?Sized>(
        &self,
        identity: &Identity,
        segments: &[&str],
        body: &B,
        extra_timeout: Duration,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.url(segments)?;
        debug!(url = %url, "POST request");

        let mut request = self.inner.post(url).json(body);
        if let Some(header) = identity.bearer_header() {
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout + extra_timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                path: segments.join("/"),
                body,
            });
        }

        Ok(response)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl ExternalTaskApi for HttpExternalTaskClient {
    async fn fetch_and_lock(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        topic: &str,
        max_tasks: u32,
        long_polling_timeout: Duration,
        lock_duration: Duration,
    ) -> Result<Vec<ExternalTask>, ClientError> {
        let request = FetchAndLockRequest {
            worker_id: worker_id.as_str(),
            topic_name: topic,
            max_tasks,
            long_polling_timeout: millis(long_polling_timeout),
            lock_duration: millis(lock_duration),
        };

        let response = self
            .post(identity, &["fetch_and_lock"], &request, long_polling_timeout)
            .await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    async fn extend_lock(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        additional_duration: Duration,
    ) -> Result<(), ClientError> {
        let request = ExtendLockRequest {
            worker_id: worker_id.as_str(),
            additional_duration: millis(additional_duration),
        };
        let segments = ["task", task_id.as_str(), "extend_lock"];

        self.post(identity, &segments, &request, Duration::ZERO).await?;
        Ok(())
    }

    async fn finish(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        result: &Value,
    ) -> Result<(), ClientError> {
        let request = FinishRequest {
            worker_id: worker_id.as_str(),
            result,
        };
        let segments = ["task", task_id.as_str(), "finish"];

        self.post(identity, &segments, &request, Duration::ZERO).await?;
        Ok(())
    }

    async fn handle_bpmn_error(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        error_code: &str,
        error_message: Option<&str>,
        error_details: Option<&str>,
    ) -> Result<(), ClientError> {
        let request = HandleBpmnErrorRequest {
            worker_id: worker_id.as_str(),
            error_code,
            error_message,
            error_details,
        };
        let segments = ["task", task_id.as_str(), "handle_bpmn_error"];

        self.post(identity, &segments, &request, Duration::ZERO).await?;
        Ok(())
    }

    async fn handle_service_error(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        error_message: &str,
        error_details: &str,
    ) -> Result<(), ClientError> {
        let request = HandleServiceErrorRequest {
            worker_id: worker_id.as_str(),
            error_message,
            error_details,
        };
        let segments = ["task", task_id.as_str(), "handle_service_error"];

        self.post(identity, &segments, &request, Duration::ZERO).await?;
        Ok(())
    }
}

//! Capability interface for the external task API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use lockrun_core::{ExternalTask, ExternalTaskId, Identity, WorkerId};

use crate::error::ClientError;

/// Remote operations the worker needs from the backend.
///
/// Implement this trait to run the worker against something other than the
/// HTTP API, e.g. an in-memory fake in tests.
#[async_trait]
pub trait ExternalTaskApi: Send + Sync {
    /// Claim up to `max_tasks` tasks for `topic`, waiting at most
    /// `long_polling_timeout` for work to show up.
    async fn fetch_and_lock(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        topic: &str,
        max_tasks: u32,
        long_polling_timeout: Duration,
        lock_duration: Duration,
    ) -> Result<Vec<ExternalTask>, ClientError>;

    /// Extend the lock on a claimed task by `additional_duration`.
    async fn extend_lock(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        additional_duration: Duration,
    ) -> Result<(), ClientError>;

    /// Report successful completion.
    async fn finish(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        result: &Value,
    ) -> Result<(), ClientError>;

    /// Report a business (BPMN) error.
    async fn handle_bpmn_error(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        error_code: &str,
        error_message: Option<&str>,
        error_details: Option<&str>,
    ) -> Result<(), ClientError>;

    /// Report an unexpected failure.
    async fn handle_service_error(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        error_message: &str,
        error_details: &str,
    ) -> Result<(), ClientError>;
}

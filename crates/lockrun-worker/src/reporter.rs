//! Result reporter: maps a task outcome onto the matching remote call.

use tracing::debug;

use lockrun_client::{ClientError, ExternalTaskApi};
use lockrun_core::{ExternalTaskId, Identity, TaskOutcome, WorkerId};

/// Send the terminal report for one task. Exactly one remote call is made.
///
/// Failures are returned to the caller and never retried; the backend
/// reclaims the task once its lock expires.
pub async fn report(
    api: &dyn ExternalTaskApi,
    identity: &Identity,
    worker_id: &WorkerId,
    task_id: &ExternalTaskId,
    outcome: &TaskOutcome,
) -> Result<(), ClientError> {
    debug!(task_id = %task_id, outcome = outcome.kind(), "Reporting task outcome");

    match outcome {
        TaskOutcome::Finished { result } => api.finish(identity, worker_id, task_id, result).await,
        TaskOutcome::BusinessError {
            code,
            message,
            details,
        } => {
            api.handle_bpmn_error(
                identity,
                worker_id,
                task_id,
                code,
                message.as_deref(),
                details.as_deref(),
            )
            .await
        }
        TaskOutcome::ServiceError { message, details } => {
            api.handle_service_error(identity, worker_id, task_id, message, details).await
        }
    }
}

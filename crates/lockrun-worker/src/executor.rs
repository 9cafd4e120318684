//! Concurrent task executor.
//!
//! Runs the handler for every task of a batch in its own tokio task and waits
//! for all of them. A failing or panicking handler only affects its own task,
//! which is then reported as a service error.

use std::any::Any;
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{error, info};

use lockrun_client::ExternalTaskApi;
use lockrun_core::{ExternalTask, Identity, TaskOutcome, WorkerId};

use crate::handler::TaskHandler;
use crate::reporter;

/// Counts for one executed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub finished: usize,
    pub business_errors: usize,
    pub service_errors: usize,
    /// Tasks whose terminal report was rejected or never sent.
    pub report_failures: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &TaskOutcome, reported: bool) {
        match outcome {
            TaskOutcome::Finished { .. } => self.finished += 1,
            TaskOutcome::BusinessError { .. } => self.business_errors += 1,
            TaskOutcome::ServiceError { .. } => self.service_errors += 1,
        }
        if !reported {
            self.report_failures += 1;
        }
    }
}

/// Executes claimed batches with a fixed handler.
#[derive(Clone)]
pub struct TaskExecutor {
    api: Arc<dyn ExternalTaskApi>,
    identity: Identity,
    worker_id: WorkerId,
    handler: Arc<dyn TaskHandler>,
}

impl TaskExecutor {
    /// Create a new TaskExecutor.
    pub fn new(
        api: Arc<dyn ExternalTaskApi>,
        identity: Identity,
        worker_id: WorkerId,
        handler: Arc<dyn TaskHandler>,
    ) -> Self {
        Self {
            api,
            identity,
            worker_id,
            handler,
        }
    }

    /// Run every task of `batch` concurrently and wait until each one has
    /// been handled and reported.
    pub async fn execute_batch(&self, batch: Arc<[ExternalTask]>) -> BatchSummary {
        let mut summary = BatchSummary {
            total: batch.len(),
            ..BatchSummary::default()
        };

        let mut units = Vec::with_capacity(batch.len());
        for index in 0..batch.len() {
            let executor = self.clone();
            let batch = batch.clone();
            let task_id = batch[index].id.clone();

            let unit = tokio::spawn(async move { executor.execute_task(&batch[index]).await });
            units.push((task_id, unit));
        }

        for (task_id, unit) in units {
            match unit.await {
                Ok((outcome, reported)) => summary.record(&outcome, reported),
                Err(e) => {
                    error!(task_id = %task_id, error = %e, "Task execution unit failed");
                    summary.report_failures += 1;
                }
            }
        }

        summary
    }

    async fn execute_task(&self, task: &ExternalTask) -> (TaskOutcome, bool) {
        let outcome = self.run_handler(task).await;

        let reported = match reporter::report(
            self.api.as_ref(),
            &self.identity,
            &self.worker_id,
            &task.id,
            &outcome,
        )
        .await
        {
            Ok(()) => {
                info!(task_id = %task.id, outcome = outcome.kind(), "Task reported");
                true
            }
            Err(e) => {
                error!(
                    task_id = %task.id,
                    outcome = outcome.kind(),
                    error = %e,
                    "Failed to report task outcome"
                );
                false
            }
        };

        (outcome, reported)
    }

    /// Invoke the handler in its own task so that a panic is contained.
    async fn run_handler(&self, task: &ExternalTask) -> TaskOutcome {
        let handler = self.handler.clone();
        let owned = task.clone();
        let joined = tokio::spawn(async move { handler.handle(&owned).await }).await;

        match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(task_id = %task.id, error = %e, "Failed to execute task");
                TaskOutcome::service_error(failure_message(e.to_string()), "")
            }
            Err(e) => {
                let message = join_error_message(e);
                error!(task_id = %task.id, error = %message, "Failed to execute task");
                TaskOutcome::service_error(message, "")
            }
        }
    }
}

fn failure_message(message: String) -> String {
    if message.trim().is_empty() {
        "task handler failed".to_string()
    } else {
        message
    }
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "task handler was cancelled".to_string();
    }
    match panic_text(err.into_panic().as_ref()) {
        Some(text) => format!("task handler panicked: {}", text),
        None => "task handler panicked".to_string(),
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        Some((*s).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}

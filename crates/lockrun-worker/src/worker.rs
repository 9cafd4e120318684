//! The worker loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use lockrun_client::ExternalTaskApi;
use lockrun_core::{ExternalTask, Identity, WorkerId};

use crate::config::{ConfigError, WorkerConfig};
use crate::executor::{BatchSummary, TaskExecutor};
use crate::fetcher::TaskFetcher;
use crate::handler::TaskHandler;
use crate::renewal::RenewalHandle;

/// Where the worker loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fetching,
    BatchActive { tasks: usize },
    Stopped,
}

/// Fetches, locks and processes external tasks for one topic.
pub struct ExternalTaskWorker {
    api: Arc<dyn ExternalTaskApi>,
    identity: Identity,
    worker_id: WorkerId,
    config: WorkerConfig,
    fetcher: TaskFetcher,
    executor: TaskExecutor,
    state_tx: watch::Sender<WorkerState>,
}

impl ExternalTaskWorker {
    /// Create a worker with a freshly generated worker ID.
    pub fn new(
        api: Arc<dyn ExternalTaskApi>,
        identity: Identity,
        config: WorkerConfig,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let worker_id = WorkerId::generate();
        let fetcher = TaskFetcher::new(api.clone(), worker_id.clone(), config.retry_delay);
        let executor = TaskExecutor::new(api.clone(), identity.clone(), worker_id.clone(), handler);
        let (state_tx, _) = watch::channel(WorkerState::Idle);

        Ok(Self {
            api,
            identity,
            worker_id,
            config,
            fetcher,
            executor,
            state_tx,
        })
    }

    /// ID sent with every call made by this worker.
    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Configuration the worker was built with.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Watch the loop's state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state_tx.subscribe()
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Cancellation interrupts a pending fetch. A batch that is already
    /// executing always runs to completion first.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            worker_id = %self.worker_id,
            topic = %self.config.topic,
            max_tasks = self.config.max_tasks,
            "Starting external task worker"
        );

        while !shutdown.is_cancelled() {
            let tasks = tokio::select! {
                _ = shutdown.cancelled() => break,
                tasks = self.fetch_batch() => tasks,
            };

            self.process_batch(tasks).await;
        }

        self.set_state(WorkerState::Stopped);
        info!(worker_id = %self.worker_id, "External task worker stopped");
    }

    /// Fetch one batch and process it.
    pub async fn run_once(&self) -> BatchSummary {
        let tasks = self.fetch_batch().await;
        self.process_batch(tasks).await
    }

    async fn fetch_batch(&self) -> Vec<ExternalTask> {
        self.set_state(WorkerState::Fetching);
        self.fetcher
            .fetch(
                &self.identity,
                &self.config.topic,
                self.config.max_tasks,
                self.config.long_poll_timeout,
                self.config.lease_duration,
            )
            .await
    }

    async fn process_batch(&self, tasks: Vec<ExternalTask>) -> BatchSummary {
        if tasks.is_empty() {
            debug!(topic = %self.config.topic, "No tasks available");
            self.set_state(WorkerState::Idle);
            return BatchSummary::default();
        }

        let batch: Arc<[ExternalTask]> = tasks.into();
        self.set_state(WorkerState::BatchActive { tasks: batch.len() });
        info!(
            worker_id = %self.worker_id,
            topic = %self.config.topic,
            tasks = batch.len(),
            "Processing batch"
        );

        let renewal = RenewalHandle::start(
            self.api.clone(),
            self.identity.clone(),
            self.worker_id.clone(),
            batch.clone(),
            self.config.lease_duration,
            self.config.renewal_interval(),
        );

        let summary = self.executor.execute_batch(batch).await;
        renewal.stop().await;

        info!(
            worker_id = %self.worker_id,
            total = summary.total,
            finished = summary.finished,
            business_errors = summary.business_errors,
            service_errors = summary.service_errors,
            report_failures = summary.report_failures,
            "Batch completed"
        );

        self.set_state(WorkerState::Idle);
        summary
    }

    fn set_state(&self, state: WorkerState) {
        self.state_tx.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, HandlerError};
    use crate::testing::{task, Call, FakeApi};
    use lockrun_core::TaskOutcome;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn config() -> WorkerConfig {
        WorkerConfig {
            max_tasks: 5,
            ..WorkerConfig::new("orders")
        }
    }

    fn echo() -> Arc<dyn TaskHandler> {
        Arc::new(handler_fn(|task: ExternalTask| async move {
            Ok::<_, HandlerError>(TaskOutcome::finished(task.payload))
        }))
    }

    fn worker(api: &Arc<FakeApi>, handler: Arc<dyn TaskHandler>) -> ExternalTaskWorker {
        ExternalTaskWorker::new(api.clone(), Identity::new("token"), config(), handler).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let api = Arc::new(FakeApi::new());
        let result = ExternalTaskWorker::new(
            api,
            Identity::anonymous(),
            WorkerConfig::new(""),
            echo(),
        );
        assert!(matches!(result, Err(ConfigError::EmptyTopic)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_skips_renewal_and_execution() {
        let api = Arc::new(FakeApi::new());
        let worker = worker(&api, echo());
        let state = worker.subscribe_state();

        let summary = worker.run_once().await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(summary, BatchSummary::default());
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], Call::Fetch { .. }));
        assert_eq!(*state.borrow(), WorkerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_task_reported_once_and_renewal_stopped() {
        let api = Arc::new(FakeApi::new());
        api.push_batch(vec![task("a"), task("b"), task("c")]);

        // Outlive two renewal ticks (25s, 50s) before reporting.
        let handler: Arc<dyn TaskHandler> = Arc::new(handler_fn(|task: ExternalTask| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, HandlerError>(TaskOutcome::finished(task.payload))
        }));
        let worker = worker(&api, handler);

        let summary = worker.run_once().await;
        assert_eq!(summary.finished, 3);

        let mut reports: HashMap<String, usize> = HashMap::new();
        for call in api.terminal_calls() {
            *reports.entry(call.task_id().unwrap().to_string()).or_default() += 1;
        }
        assert_eq!(reports.len(), 3);
        assert!(reports.values().all(|count| *count == 1));

        assert_eq!(api.extend_calls().len(), 6);

        // Nothing renews a batch that is already reported.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(api.extend_calls().len(), 6);

        // Every call carries this worker's credential.
        assert!(api.tokens().iter().all(|t| t.as_deref() == Some("token")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_and_failed_tasks_in_one_batch() {
        let api = Arc::new(FakeApi::new());
        api.push_batch(vec![task("A"), task("B")]);

        let handler: Arc<dyn TaskHandler> = Arc::new(handler_fn(|task: ExternalTask| async move {
            if task.id.as_str() == "B" {
                return Err(HandlerError::from("could not reach billing"));
            }
            Ok(TaskOutcome::finished(json!({"payload": "P"})))
        }));
        let worker = worker(&api, handler);

        worker.run_once().await;

        let mut calls = api.terminal_calls();
        calls.sort_by(|x, y| x.task_id().cmp(&y.task_id()));
        assert_eq!(
            calls,
            vec![
                Call::Finish {
                    task_id: "A".to_string(),
                    result: json!({"payload": "P"}),
                },
                Call::ServiceError {
                    task_id: "B".to_string(),
                    message: "could not reach billing".to_string(),
                    details: String::new(),
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failures_delay_then_proceed() {
        let api = Arc::new(FakeApi::new());
        api.push_fetch_error("503 Service Unavailable");
        api.push_fetch_error("connection reset");
        api.push_batch(vec![task("a")]);
        let worker = worker(&api, echo());

        let start = tokio::time::Instant::now();
        let summary = worker.run_once().await;

        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(summary.finished, 1);
        assert_eq!(api.terminal_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_processes_batches_until_shutdown() {
        let api = Arc::new(FakeApi::new());
        api.push_batch(vec![task("a"), task("b")]);
        api.push_batch(Vec::new());
        api.push_batch(vec![task("c")]);

        let worker = Arc::new(worker(&api, echo()));
        let mut state = worker.subscribe_state();
        let shutdown = CancellationToken::new();

        let run = tokio::spawn({
            let worker = worker.clone();
            let shutdown = shutdown.clone();
            async move { worker.run(shutdown).await }
        });

        while api.terminal_calls().len() < 3 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        shutdown.cancel();
        run.await.unwrap();

        assert_eq!(*state.borrow_and_update(), WorkerState::Stopped);

        let reported: Vec<String> = api
            .terminal_calls()
            .iter()
            .filter_map(|c| c.task_id().map(str::to_string))
            .collect();
        assert_eq!(reported.len(), 3);
        for id in ["a", "b", "c"] {
            assert!(reported.iter().any(|r| r == id));
        }

        // Claims after the script ran out are idle long polls; none of them
        // started a renewal.
        assert!(api.extend_calls().is_empty());
        let fetches = api
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch { .. }))
            .count();
        assert!(fetches >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_batch_finishes_batch_first() {
        let api = Arc::new(FakeApi::new());
        api.push_batch(vec![task("a"), task("b")]);

        // Outlives one renewal tick (25s).
        let handler: Arc<dyn TaskHandler> = Arc::new(handler_fn(|task: ExternalTask| async move {
            tokio::time::sleep(Duration::from_secs(40)).await;
            Ok::<_, HandlerError>(TaskOutcome::finished(task.payload))
        }));
        let worker = Arc::new(worker(&api, handler));
        let mut state = worker.subscribe_state();
        let shutdown = CancellationToken::new();

        let start = tokio::time::Instant::now();
        let run = tokio::spawn({
            let worker = worker.clone();
            let shutdown = shutdown.clone();
            async move { worker.run(shutdown).await }
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*state.borrow(), WorkerState::BatchActive { tasks: 2 });
        shutdown.cancel();
        run.await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(40));
        assert_eq!(*state.borrow_and_update(), WorkerState::Stopped);
        assert_eq!(api.terminal_calls().len(), 2);
        assert_eq!(api.extend_calls().len(), 2);

        let fetches = api
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch { .. }))
            .count();
        assert_eq!(fetches, 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(api.extend_calls().len(), 2);
    }
}

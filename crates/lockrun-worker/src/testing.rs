//! In-memory `ExternalTaskApi` that records every call.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use lockrun_client::{ClientError, ExternalTaskApi};
use lockrun_core::{ExternalTask, ExternalTaskId, Identity, WorkerId};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch {
        worker_id: String,
        topic: String,
        max_tasks: u32,
        long_polling_timeout: Duration,
        lock_duration: Duration,
    },
    ExtendLock {
        task_id: String,
        additional_duration: Duration,
    },
    Finish {
        task_id: String,
        result: Value,
    },
    BpmnError {
        task_id: String,
        code: String,
        message: Option<String>,
        details: Option<String>,
    },
    ServiceError {
        task_id: String,
        message: String,
        details: String,
    },
}

impl Call {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Call::Finish { .. } | Call::BpmnError { .. } | Call::ServiceError { .. }
        )
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Call::Fetch { .. } => None,
            Call::ExtendLock { task_id, .. }
            | Call::Finish { task_id, .. }
            | Call::BpmnError { task_id, .. }
            | Call::ServiceError { task_id, .. } => Some(task_id),
        }
    }
}

/// Scripted fetch responses; once exhausted every fetch behaves like an idle
/// long poll.
#[derive(Default)]
pub struct FakeApi {
    fetches: Mutex<VecDeque<Result<Vec<ExternalTask>, String>>>,
    calls: Mutex<Vec<(Instant, Call)>>,
    tokens: Mutex<Vec<Option<String>>>,
    fail_extend: AtomicBool,
    fail_reports_for: Mutex<HashSet<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, tasks: Vec<ExternalTask>) {
        self.fetches.lock().unwrap().push_back(Ok(tasks));
    }

    pub fn push_fetch_error(&self, message: &str) {
        self.fetches
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn fail_extend(&self, fail: bool) {
        self.fail_extend.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reports_for(&self, task_id: &str) {
        self.fail_reports_for
            .lock()
            .unwrap()
            .insert(task_id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn extend_calls(&self) -> Vec<(Instant, Call)> {
        self.timed_calls()
            .into_iter()
            .filter(|(_, c)| matches!(c, Call::ExtendLock { .. }))
            .collect()
    }

    pub fn terminal_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_terminal).collect()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }

    fn record(&self, identity: &Identity, call: Call) {
        self.tokens
            .lock()
            .unwrap()
            .push(identity.token().map(str::to_string));
        self.calls.lock().unwrap().push((Instant::now(), call));
    }

    fn report_result(&self, task_id: &ExternalTaskId) -> Result<(), ClientError> {
        if self.fail_reports_for.lock().unwrap().contains(task_id.as_str()) {
            return Err(ClientError::Other(format!("report rejected for {}", task_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ExternalTaskApi for FakeApi {
    async fn fetch_and_lock(
        &self,
        identity: &Identity,
        worker_id: &WorkerId,
        topic: &str,
        max_tasks: u32,
        long_polling_timeout: Duration,
        lock_duration: Duration,
    ) -> Result<Vec<ExternalTask>, ClientError> {
        self.record(
            identity,
            Call::Fetch {
                worker_id: worker_id.to_string(),
                topic: topic.to_string(),
                max_tasks,
                long_polling_timeout,
                lock_duration,
            },
        );

        let next = self.fetches.lock().unwrap().pop_front();
        match next {
            Some(Ok(tasks)) => Ok(tasks),
            Some(Err(message)) => Err(ClientError::Other(message)),
            None => {
                tokio::time::sleep(long_polling_timeout).await;
                Ok(Vec::new())
            }
        }
    }

    async fn extend_lock(
        &self,
        identity: &Identity,
        _worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        additional_duration: Duration,
    ) -> Result<(), ClientError> {
        self.record(
            identity,
            Call::ExtendLock {
                task_id: task_id.to_string(),
                additional_duration,
            },
        );
        if self.fail_extend.load(Ordering::SeqCst) {
            return Err(ClientError::Other("lock already released".to_string()));
        }
        Ok(())
    }

    async fn finish(
        &self,
        identity: &Identity,
        _worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        result: &Value,
    ) -> Result<(), ClientError> {
        self.record(
            identity,
            Call::Finish {
                task_id: task_id.to_string(),
                result: result.clone(),
            },
        );
        self.report_result(task_id)
    }

    async fn handle_bpmn_error(
        &self,
        identity: &Identity,
        _worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        error_code: &str,
        error_message: Option<&str>,
        error_details: Option<&str>,
    ) -> Result<(), ClientError> {
        self.record(
            identity,
            Call::BpmnError {
                task_id: task_id.to_string(),
                code: error_code.to_string(),
                message: error_message.map(str::to_string),
                details: error_details.map(str::to_string),
            },
        );
        self.report_result(task_id)
    }

    async fn handle_service_error(
        &self,
        identity: &Identity,
        _worker_id: &WorkerId,
        task_id: &ExternalTaskId,
        error_message: &str,
        error_details: &str,
    ) -> Result<(), ClientError> {
        self.record(
            identity,
            Call::ServiceError {
                task_id: task_id.to_string(),
                message: error_message.to_string(),
                details: error_details.to_string(),
            },
        );
        self.report_result(task_id)
    }
}

pub fn task(id: &str) -> ExternalTask {
    ExternalTask::new(id, "orders", serde_json::json!({ "id": id }))
}

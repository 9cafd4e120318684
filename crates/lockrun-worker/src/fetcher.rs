//! Task fetcher: the long-poll claim call, retried until it succeeds.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use lockrun_client::ExternalTaskApi;
use lockrun_core::{ExternalTask, Identity, WorkerId};

/// Claims batches of tasks on behalf of one worker.
pub struct TaskFetcher {
    api: Arc<dyn ExternalTaskApi>,
    worker_id: WorkerId,
    retry_delay: Duration,
}

impl TaskFetcher {
    /// Create a new TaskFetcher.
    pub fn new(api: Arc<dyn ExternalTaskApi>, worker_id: WorkerId, retry_delay: Duration) -> Self {
        Self {
            api,
            worker_id,
            retry_delay,
        }
    }

    /// Claim up to `max_tasks` tasks for `topic`.
    ///
    /// Never fails: every error is logged and the same call is retried after
    /// `retry_delay`, for as long as it takes. An empty result means the long
    /// poll ran out without work.
    pub async fn fetch(
        &self,
        identity: &Identity,
        topic: &str,
        max_tasks: u32,
        long_poll_timeout: Duration,
        lease_duration: Duration,
    ) -> Vec<ExternalTask> {
        let mut attempt: u64 = 1;

        loop {
            let result = self
                .api
                .fetch_and_lock(
                    identity,
                    &self.worker_id,
                    topic,
                    max_tasks,
                    long_poll_timeout,
                    lease_duration,
                )
                .await;

            match result {
                Ok(mut tasks) => {
                    let limit = usize::try_from(max_tasks).unwrap_or(usize::MAX);
                    if tasks.len() > limit {
                        warn!(
                            topic = %topic,
                            returned = tasks.len(),
                            max_tasks = max_tasks,
                            "Backend returned more tasks than requested, dropping surplus"
                        );
                        tasks.truncate(limit);
                    }
                    debug!(topic = %topic, count = tasks.len(), attempt = attempt, "Fetched tasks");
                    return tasks;
                }
                Err(e) => {
                    warn!(
                        topic = %topic,
                        attempt = attempt,
                        error = %e,
                        "fetch_and_lock failed, retrying in {:?}", self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

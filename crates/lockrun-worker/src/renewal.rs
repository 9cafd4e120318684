//! Lease renewal for one claimed batch.
//!
//! A renewal timer lives exactly as long as its batch. It is started before
//! the batch executes and stopped once every task in it has been reported.
//! Dropping the handle cancels the timer as well, so an early return or a
//! cancelled worker future cannot leak it.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lockrun_client::ExternalTaskApi;
use lockrun_core::{ExternalTask, Identity, WorkerId};

/// Running renewal timer for one batch.
pub struct RenewalHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl RenewalHandle {
    /// Start renewing every task in `batch` each `interval`, extending the
    /// lock by `lease_duration`. The first renewal happens one full interval
    /// after start.
    pub fn start(
        api: Arc<dyn ExternalTaskApi>,
        identity: Identity,
        worker_id: WorkerId,
        batch: Arc<[ExternalTask]>,
        lease_duration: Duration,
        interval: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let period = interval.max(Duration::from_millis(1));

        let join = tokio::spawn(run_renewal_loop(
            api,
            identity,
            worker_id,
            batch,
            lease_duration,
            period,
            token.clone(),
        ));

        Self {
            token,
            join: Some(join),
        }
    }

    /// Whether the timer is still running.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Cancel the timer and wait for it to exit. No renewal call is issued
    /// after this returns.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!(error = %e, "Lease renewal task ended abnormally");
            }
        }
    }
}

impl Drop for RenewalHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_renewal_loop(
    api: Arc<dyn ExternalTaskApi>,
    identity: Identity,
    worker_id: WorkerId,
    batch: Arc<[ExternalTask]>,
    lease_duration: Duration,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        debug!(tasks = batch.len(), "Extending locks");

        // In-flight renewals are abandoned as soon as the batch is done.
        tokio::select! {
            _ = token.cancelled() => break,
            _ = extend_locks(api.as_ref(), &identity, &worker_id, &batch, lease_duration) => {}
        }
    }
}

async fn extend_locks(
    api: &dyn ExternalTaskApi,
    identity: &Identity,
    worker_id: &WorkerId,
    batch: &[ExternalTask],
    lease_duration: Duration,
) {
    let renewals = batch.iter().map(|task| async move {
        if let Err(e) = api
            .extend_lock(identity, worker_id, &task.id, lease_duration)
            .await
        {
            // Usually the task was reported just before the tick.
            warn!(task_id = %task.id, error = %e, "Failed to extend lock");
        }
    });

    join_all(renewals).await;
}

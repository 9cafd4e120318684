//! Application handler seam.

use std::future::Future;

use async_trait::async_trait;

use lockrun_core::{ExternalTask, TaskOutcome};

/// Error type handlers may fail with. It is reported as a service error.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handling logic for claimed external tasks.
///
/// Called exactly once per claimed task. Returning `Err` (or panicking) turns
/// into a `ServiceError` report for that task only.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: &ExternalTask) -> Result<TaskOutcome, HandlerError>;
}

/// [`TaskHandler`] backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a [`TaskHandler`].
///
/// ```rust,no_run
/// use lockrun_core::TaskOutcome;
/// use lockrun_worker::{handler_fn, HandlerError};
///
/// let handler = handler_fn(|task| async move {
///     Ok::<_, HandlerError>(TaskOutcome::finished(task.payload))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(ExternalTask) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutcome, HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(ExternalTask) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutcome, HandlerError>> + Send + 'static,
{
    async fn handle(&self, task: &ExternalTask) -> Result<TaskOutcome, HandlerError> {
        (self.f)(task.clone()).await
    }
}

//! lockrun worker
//!
//! Claims batches of external tasks, runs application handlers against them
//! concurrently, keeps their locks alive while they run and reports one
//! terminal outcome per task.
//!
//! The loop is:
//! fetch batch -> start lease renewal -> execute batch -> stop renewal -> repeat.

pub mod config;
pub mod executor;
pub mod fetcher;
pub mod handler;
pub mod renewal;
pub mod reporter;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, WorkerConfig};
pub use executor::{BatchSummary, TaskExecutor};
pub use fetcher::TaskFetcher;
pub use handler::{handler_fn, FnHandler, HandlerError, TaskHandler};
pub use renewal::RenewalHandle;
pub use worker::{ExternalTaskWorker, WorkerState};

//! lockrun worker daemon
//!
//! Claims tasks for one topic and finishes each with its own payload. Useful
//! for smoke-testing a process engine's external task setup.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lockrun_client::{ClientConfig, HttpExternalTaskClient};
use lockrun_core::{ExternalTask, Identity, TaskOutcome};
use lockrun_worker::{handler_fn, ExternalTaskWorker, HandlerError, WorkerConfig};

/// External task worker for the process engine.
#[derive(Parser, Debug)]
#[command(name = "lockrun-worker", about = "Lease-based external task worker")]
struct Args {
    /// Process engine base URL
    #[arg(long, default_value = "http://localhost:8000")]
    engine_url: String,

    /// Bearer token sent with every call
    #[arg(long, env = "LOCKRUN_TOKEN")]
    token: Option<String>,

    /// Topic to claim tasks for
    #[arg(long)]
    topic: String,

    /// Maximum tasks claimed per batch
    #[arg(long, default_value = "10")]
    max_tasks: u32,

    /// Long-poll timeout in milliseconds
    #[arg(long, default_value = "10000")]
    long_poll_timeout_ms: u64,

    /// Lock duration in milliseconds
    #[arg(long, default_value = "30000")]
    lease_duration_ms: u64,

    /// Renew this many milliseconds before the lock runs out
    #[arg(long, default_value = "5000")]
    renewal_margin_ms: u64,

    /// Delay between failed fetch attempts in milliseconds
    #[arg(long, default_value = "1000")]
    retry_delay_ms: u64,

    /// Per-request HTTP timeout in milliseconds
    #[arg(long, default_value = "30000")]
    request_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lockrun_worker=info,lockrun_client=info")),
        )
        .with_target(true)
        .init();

    let identity = match args.token {
        Some(token) => Identity::new(token),
        None => Identity::anonymous(),
    };

    let client = HttpExternalTaskClient::new(ClientConfig {
        base_url: args.engine_url.clone(),
        request_timeout: Some(Duration::from_millis(args.request_timeout_ms)),
    });

    let config = WorkerConfig {
        topic: args.topic,
        max_tasks: args.max_tasks,
        long_poll_timeout: Duration::from_millis(args.long_poll_timeout_ms),
        lease_duration: Duration::from_millis(args.lease_duration_ms),
        renewal_margin: Duration::from_millis(args.renewal_margin_ms),
        retry_delay: Duration::from_millis(args.retry_delay_ms),
    };

    let handler = handler_fn(|task: ExternalTask| async move {
        info!(task_id = %task.id, topic = %task.topic, "Echoing task payload");
        Ok::<_, HandlerError>(TaskOutcome::finished(task.payload))
    });

    let worker = ExternalTaskWorker::new(Arc::new(client), identity, config, Arc::new(handler))?;

    info!(
        worker_id = %worker.worker_id(),
        engine = %args.engine_url,
        "Starting lockrun worker"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested, finishing current batch"),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
        }
        signal_token.cancel();
    });

    worker.run(shutdown).await;

    Ok(())
}

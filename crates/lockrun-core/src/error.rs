//! Core domain errors.

use thiserror::Error;

/// Core domain errors for lockrun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Task payload could not be decoded into the requested type.
    #[error("Invalid payload for task {task_id}: {source}")]
    Payload {
        task_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded as a task result.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

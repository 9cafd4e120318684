//! Error types for the external task client.

use thiserror::Error;

/// Errors that can occur when calling the external task API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status} from {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    /// Base URL cannot be turned into an endpoint URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other failure, used by alternative `ExternalTaskApi` implementations.
    #[error("{0}")]
    Other(String),
}

//! External task API client for lockrun.
//!
//! Provides the [`ExternalTaskApi`] capability used by the worker and an HTTP
//! implementation talking to the process engine's external task endpoints.

pub mod api;
pub mod error;
pub mod http;
pub mod requests;

pub use api::ExternalTaskApi;
pub use error::ClientError;
pub use http::{ClientConfig, HttpExternalTaskClient};

//! lockrun Core Domain Types
//!
//! This crate contains the pure domain types shared by the lease API client
//! and the worker, with no dependencies on:
//! - HTTP transport
//! - Runtime specifics
//!
//! All types here describe claimed work and the outcome reported for it.

pub mod error;
pub mod identity;
pub mod ids;
pub mod outcome;
pub mod task;

// Re-export commonly used types
pub use error::CoreError;
pub use identity::Identity;
pub use ids::{ExternalTaskId, WorkerId};
pub use outcome::TaskOutcome;
pub use task::ExternalTask;

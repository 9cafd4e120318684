//! Terminal outcome of handling one external task.

use serde::Serialize;
use serde_json::Value;

use crate::CoreError;

/// What the handling logic decided for a task.
///
/// Exactly one outcome is reported per claimed task. The worker synthesizes a
/// `ServiceError` when the handler itself fails.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Task completed; `result` is sent back to the backend.
    Finished { result: Value },

    /// Expected, caller-classified failure.
    BusinessError {
        code: String,
        message: Option<String>,
        details: Option<String>,
    },

    /// Unexpected failure while processing the task.
    ServiceError { message: String, details: String },
}

impl TaskOutcome {
    /// Finished with an already-encoded result.
    pub fn finished(result: Value) -> Self {
        Self::Finished { result }
    }

    /// Finished with any serializable result.
    pub fn finished_with<T: Serialize>(result: &T) -> Result<Self, CoreError> {
        Ok(Self::Finished {
            result: serde_json::to_value(result)?,
        })
    }

    /// Business error with only an error code.
    pub fn business_error(code: impl Into<String>) -> Self {
        Self::BusinessError {
            code: code.into(),
            message: None,
            details: None,
        }
    }

    /// Builder method to attach a message to a business error.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        match self {
            Self::BusinessError { code, details, .. } => Self::BusinessError {
                code,
                message: Some(message.into()),
                details,
            },
            other => other,
        }
    }

    /// Builder method to attach details to a business error.
    pub fn with_details(self, details: impl Into<String>) -> Self {
        match self {
            Self::BusinessError { code, message, .. } => Self::BusinessError {
                code,
                message,
                details: Some(details.into()),
            },
            other => other,
        }
    }

    /// Service error with message and details.
    pub fn service_error(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ServiceError {
            message: message.into(),
            details: details.into(),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Finished { .. } => "finished",
            Self::BusinessError { .. } => "business_error",
            Self::ServiceError { .. } => "service_error",
        }
    }
}

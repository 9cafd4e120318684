//! External task types.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{CoreError, ExternalTaskId, WorkerId};

/// An ExternalTask is one unit of claimed work returned by fetch-and-lock.
///
/// Only `id` is guaranteed by the backend; everything else falls back to a
/// default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTask {
    /// Unique task identifier.
    pub id: ExternalTaskId,

    /// Topic the task was published under.
    #[serde(default)]
    pub topic: String,

    /// Input payload.
    #[serde(default)]
    pub payload: Value,

    /// Worker currently holding the lock, as seen by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,

    /// Process instance the task belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_instance_id: Option<String>,

    /// Correlation the process instance belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Flow node instance that produced the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_node_instance_id: Option<String>,

    /// When the current lock runs out. Unparsable values are dropped.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub lock_expiration_time: Option<DateTime<Utc>>,

    /// When the task was created. Unparsable values are dropped.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExternalTask {
    /// Create a new ExternalTask.
    pub fn new(id: impl Into<ExternalTaskId>, topic: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            payload,
            worker_id: None,
            process_instance_id: None,
            correlation_id: None,
            flow_node_instance_id: None,
            lock_expiration_time: None,
            created_at: None,
        }
    }

    /// Decode the payload into a typed value.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        serde_json::from_value(self.payload.clone()).map_err(|source| CoreError::Payload {
            task_id: self.id.to_string(),
            source,
        })
    }
}

/// Informational timestamps must never make a claimed batch unreadable.
/// RFC 3339 is parsed as is, offset-less values are taken as UTC, anything
/// else becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::String(text)) = raw else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive)))
}

//! Request bodies sent to the external task API.
//!
//! Field names are camelCase on the wire and durations are milliseconds.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAndLockRequest<'a> {
    pub worker_id: &'a str,
    pub topic_name: &'a str,
    pub max_tasks: u32,
    pub long_polling_timeout: u64,
    pub lock_duration: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendLockRequest<'a> {
    pub worker_id: &'a str,
    pub additional_duration: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRequest<'a> {
    pub worker_id: &'a str,
    pub result: &'a Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleBpmnErrorRequest<'a> {
    pub worker_id: &'a str,
    pub error_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleServiceErrorRequest<'a> {
    pub worker_id: &'a str,
    pub error_message: &'a str,
    pub error_details: &'a str,
}

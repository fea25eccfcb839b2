//! Wire types for the agent execution endpoints.

use agentrun_core::{ExecutionState, Timestamp};
use serde::{Deserialize, Serialize};

/// Body of `POST /{account}/agent/{agent}/execute`.
#[derive(Debug, Serialize)]
pub struct ExecuteRequest<'a> {
    pub inputs: &'a serde_json::Value,
}

/// Response to an execute call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    #[serde(default)]
    pub status: Option<String>,
    /// Missing or empty means the service did not start a job.
    #[serde(default)]
    pub execution_id: Option<String>,
}

/// Response to `GET /{account}/agent/{execution_id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub execution: ExecutionRecord,
}

/// Server-side view of one execution.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub status: ExecutionState,
    #[serde(default)]
    pub outputs: Option<serde_json::Value>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub queued_at: Option<Timestamp>,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub finished_at: Option<Timestamp>,
}

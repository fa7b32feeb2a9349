//! Run identifiers, backend response bodies and run snapshots.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{BackendNodeState, RunPhase};

/// Opaque identifier of a pipeline execution, issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, used in status bars and file names
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One line of backend execution log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
}

/// Body of `GET /status/{runId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub run_id: RunId,

    pub status: RunPhase,

    #[serde(default)]
    pub nodes: HashMap<String, BackendNodeState>,

    /// Opaque result payload, passed through to the results view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub logs: Vec<LogEntry>,

    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub updated_at: String,
}

/// Body of `POST /run`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunResponse {
    pub run_id: RunId,

    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Immutable view of a run at one poll.
///
/// Every poll yields a fresh snapshot that supersedes the previous one.
/// `node_states` may be partial; nodes absent from it are unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub phase: RunPhase,
    pub node_states: HashMap<String, BackendNodeState>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub logs: Vec<LogEntry>,
    pub fetched_at: DateTime<Utc>,
}

impl RunSnapshot {
    /// Build a snapshot from a status response received now
    pub fn from_response(response: StatusResponse) -> Self {
        Self {
            run_id: response.run_id,
            phase: response.status,
            node_states: response.nodes,
            result: response.result,
            error_message: response.error,
            logs: response.logs,
            fetched_at: Utc::now(),
        }
    }

    /// Synthetic error snapshot for a fetch that never produced a response
    pub fn transport_failure(run_id: RunId, message: impl Into<String>) -> Self {
        Self {
            run_id,
            phase: RunPhase::Error,
            node_states: HashMap::new(),
            result: None,
            error_message: Some(message.into()),
            logs: Vec::new(),
            fetched_at: Utc::now(),
        }
    }
}

//! Node and run status vocabularies.
//!
//! The backend reports a closed four-state vocabulary per node. The graph
//! renderer only understands [`UiNodeStatus`], and [`map_status`] is the one
//! legal translation between the two.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status string is outside the closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized {kind} '{value}'")]
pub struct ParseStateError {
    pub kind: &'static str,
    pub value: String,
}

/// Per-node execution state as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendNodeState {
    /// Not yet started
    Idle,

    /// Currently executing
    Running,

    /// Finished successfully
    Success,

    /// Finished with an error
    Error,
}

impl BackendNodeState {
    pub const ALL: [BackendNodeState; 4] = [
        BackendNodeState::Idle,
        BackendNodeState::Running,
        BackendNodeState::Success,
        BackendNodeState::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl FromStr for BackendNodeState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(ParseStateError {
                kind: "node state",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for BackendNodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node status in the vocabulary the graph renderer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiNodeStatus {
    #[default]
    Initial,
    Loading,
    Success,
    Error,
}

impl UiNodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for UiNodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate a backend node state into the renderer vocabulary.
///
/// Total and deterministic. No catch-all arm: a new backend state is a
/// compile error here until it is mapped.
pub fn map_status(state: BackendNodeState) -> UiNodeStatus {
    match state {
        BackendNodeState::Idle => UiNodeStatus::Initial,
        BackendNodeState::Running => UiNodeStatus::Loading,
        BackendNodeState::Success => UiNodeStatus::Success,
        BackendNodeState::Error => UiNodeStatus::Error,
    }
}

impl From<BackendNodeState> for UiNodeStatus {
    fn from(state: BackendNodeState) -> Self {
        map_status(state)
    }
}

/// Phase of a run as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    /// No snapshot received yet
    #[default]
    Idle,

    /// Pipeline executing
    Running,

    /// Completed successfully
    Success,

    /// Failed (backend-reported or transport failure)
    Error,

    /// Torn down by the caller
    Cancelled,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether polling must stop once this phase is observed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Cancelled)
    }

    /// Status-bar label shown for this phase
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Waiting for pipeline...",
            Self::Running => "Pipeline Executing...",
            Self::Success => "Pipeline Completed!",
            Self::Error => "Pipeline Failed",
            Self::Cancelled => "Pipeline Cancelled",
        }
    }
}

impl FromStr for RunPhase {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseStateError {
                kind: "run phase",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

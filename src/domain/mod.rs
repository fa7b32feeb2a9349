//! Domain types for the run-status core.
//!
//! This module contains the core data structures:
//! - Status: backend and renderer status vocabularies
//! - Snapshot: run identifiers, wire bodies, per-poll snapshots
//! - Result: typed view of the opaque result payload

pub mod result;
pub mod snapshot;
pub mod status;

// Re-export commonly used types
pub use result::PipelineResult;
pub use snapshot::{LogEntry, RunId, RunSnapshot, StartRunResponse, StatusResponse};
pub use status::{map_status, BackendNodeState, ParseStateError, RunPhase, UiNodeStatus};

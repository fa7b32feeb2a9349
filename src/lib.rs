//! ltuas - run-status client for the LTUAS audio inference pipeline
//!
//! Submits audio to the inference backend, follows a run's node graph by
//! polling its status, and routes to the results once the run settles.
//!
//! # Architecture
//!
//! A run is observed, never driven:
//! - The backend owns execution; this crate only polls `GET /status/{runId}`
//! - Each poll result is projected onto a fixed pipeline graph
//! - A completion router reacts to the projected phase (navigate, freeze, teardown)
//!
//! # Modules
//!
//! - `adapters`: Backend HTTP client
//! - `core`: Poller, projector, completion router, sessions, results
//! - `domain`: Status enums, snapshots, result payloads
//! - `graph`: Static pipeline topology
//! - `ingest`: Audio upload validation
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Submit audio and follow the run
//! ltuas run clip.wav --prompt "What is happening here?"
//!
//! # Check run status
//! ltuas status <run-id>
//!
//! # Export results
//! ltuas result <run-id> --save
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod graph;
pub mod ingest;

// Re-export main types at crate root for convenience
pub use adapters::{ApiError, BackendClient, RunBackend, StatusSource};
pub use core::{
    CompletionRouter, Navigator, PollConfig, PollerState, RouterOutcome, RunPoller, RunSession,
    RunStatusProjector, RunView, Surface,
};
pub use domain::{map_status, BackendNodeState, RunId, RunPhase, RunSnapshot, UiNodeStatus};
pub use graph::PipelineGraph;

//! Core run-status logic.
//!
//! This module contains:
//! - Poller: polling loop and cancellation for one run
//! - Projector: merged per-node status table and run phase
//! - Router: completion handling (navigate, freeze, teardown)
//! - Session: the three wired together for one UI surface
//! - Results: results loading and export

pub mod poller;
pub mod projector;
pub mod results;
pub mod router;
pub mod session;

// Re-export commonly used types
pub use poller::{PollConfig, PollerError, PollerState, RunPoller, SnapshotSubscriber};
pub use projector::{RunStatusProjector, RunView};
pub use results::{export_file_name, export_result, load_results, ResultsOutcome};
pub use router::{CompletionRouter, Navigator, RouterAction, RouterOutcome, Surface};
pub use session::RunSession;

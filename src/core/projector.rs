//! Run status projector.
//!
//! Folds poller snapshots into the authoritative `(phase, node table)` pair
//! for the active run and publishes it through a watch channel: one writer,
//! any number of readers (graph renderer, status bar, completion router).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::poller::SnapshotSubscriber;
use crate::domain::{map_status, LogEntry, RunId, RunPhase, RunSnapshot, UiNodeStatus};
use crate::graph::{NodeStatusTable, PipelineGraph, PipelineNode};

/// Message shown when the backend itself reports the run as cancelled
const BACKEND_CANCELLED: &str = "Run was cancelled";

/// Message shown for an error phase without a backend message
const GENERIC_FAILURE: &str = "Pipeline failed";

/// What consumers render for the active run
#[derive(Debug, Clone, PartialEq)]
pub struct RunView {
    pub run_id: Option<RunId>,
    pub phase: RunPhase,
    pub nodes: NodeStatusTable,
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub logs: Vec<LogEntry>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RunView {
    fn initial(graph: &PipelineGraph, run_id: Option<RunId>) -> Self {
        Self {
            run_id,
            phase: RunPhase::Idle,
            nodes: graph.initial_table(),
            error_message: None,
            result: None,
            logs: Vec::new(),
            updated_at: None,
        }
    }

    pub fn status_of(&self, node_id: &str) -> UiNodeStatus {
        self.nodes.get(node_id).copied().unwrap_or_default()
    }
}

/// Maintains and publishes the [`RunView`] of one session
#[derive(Clone)]
pub struct RunStatusProjector {
    graph: PipelineGraph,
    tx: Arc<watch::Sender<RunView>>,
}

impl RunStatusProjector {
    pub fn new(graph: PipelineGraph) -> Self {
        let (tx, _rx) = watch::channel(RunView::initial(&graph, None));
        Self {
            graph,
            tx: Arc::new(tx),
        }
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// New reader of the projected view
    pub fn subscribe(&self) -> watch::Receiver<RunView> {
        self.tx.subscribe()
    }

    /// Copy of the current view
    pub fn current(&self) -> RunView {
        self.tx.borrow().clone()
    }

    /// Point the projector at a (new) run with an all-`initial` table
    pub fn reset(&self, run_id: RunId) {
        debug!(%run_id, "Resetting node status table");
        let view = RunView::initial(&self.graph, Some(run_id));
        self.tx.send_replace(view);
    }

    /// Mark the view torn down. Node statuses are left as last seen.
    pub fn teardown(&self) {
        self.tx.send_if_modified(|view| {
            if view.phase == RunPhase::Cancelled {
                return false;
            }
            view.phase = RunPhase::Cancelled;
            true
        });
    }

    /// Merge one snapshot. Returns whether the view changed.
    ///
    /// Only node keys present in the snapshot are overwritten. Snapshots for
    /// another run, or arriving after teardown, are ignored.
    pub fn apply(&self, snapshot: &RunSnapshot) -> bool {
        self.tx.send_if_modified(|view| {
            if view.phase == RunPhase::Cancelled {
                return false;
            }
            if view.run_id.as_ref() != Some(&snapshot.run_id) {
                debug!(snapshot_run = %snapshot.run_id, "Ignoring snapshot for another run");
                return false;
            }

            let before = (view.phase, view.nodes.clone(), view.error_message.clone());

            for (node_id, state) in &snapshot.node_states {
                view.nodes.insert(node_id.clone(), map_status(*state));
            }

            match snapshot.phase {
                RunPhase::Cancelled => {
                    view.phase = RunPhase::Error;
                    view.error_message = Some(
                        snapshot
                            .error_message
                            .clone()
                            .unwrap_or_else(|| BACKEND_CANCELLED.to_string()),
                    );
                }
                RunPhase::Error => {
                    view.phase = RunPhase::Error;
                    view.error_message = Some(
                        snapshot
                            .error_message
                            .clone()
                            .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
                    );
                }
                phase => view.phase = phase,
            }

            let mut changed = view.updated_at.is_none();
            if snapshot.result.is_some() && view.result != snapshot.result {
                view.result = snapshot.result.clone();
                changed = true;
            }
            if !snapshot.logs.is_empty() && view.logs != snapshot.logs {
                view.logs = snapshot.logs.clone();
                changed = true;
            }

            changed |= before != (view.phase, view.nodes.clone(), view.error_message.clone());
            view.updated_at = Some(snapshot.fetched_at);
            changed
        })
    }

    /// Render the graph with the current overlay
    pub fn render(&self) -> Vec<(&'static PipelineNode, UiNodeStatus)> {
        self.graph.render(&self.tx.borrow().nodes)
    }
}

impl SnapshotSubscriber for RunStatusProjector {
    fn on_snapshot(&mut self, snapshot: &RunSnapshot) {
        self.apply(snapshot);
    }
}

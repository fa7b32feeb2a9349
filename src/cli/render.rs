//! Plain-text rendering of run views for the terminal.

use crate::core::RunView;
use crate::domain::{RunPhase, UiNodeStatus};
use crate::graph::{EdgeEmphasis, PipelineGraph};

fn status_marker(status: UiNodeStatus) -> &'static str {
    match status {
        UiNodeStatus::Initial => "·",
        UiNodeStatus::Loading => "…",
        UiNodeStatus::Success => "✓",
        UiNodeStatus::Error => "✗",
    }
}

/// One-line status bar: phase label plus short run id
pub fn status_bar(view: &RunView) -> String {
    match view.run_id {
        Some(ref run_id) => format!("{}  (Run ID: {})", view.phase.label(), run_id.short()),
        None => view.phase.label().to_string(),
    }
}

/// Every node with its current status, in graph order
pub fn node_lines(graph: &PipelineGraph, view: &RunView) -> Vec<String> {
    graph
        .render(&view.nodes)
        .into_iter()
        .map(|(node, status)| {
            format!(
                "  {} {:<16} {:<8} {}",
                status_marker(status),
                node.id,
                status,
                node.metadata.title
            )
        })
        .collect()
}

/// Lines describing what changed between two views of the same run
pub fn diff_lines(graph: &PipelineGraph, previous: Option<&RunView>, next: &RunView) -> Vec<String> {
    let mut lines = Vec::new();

    let phase_changed = previous.map(|p| p.phase != next.phase).unwrap_or(true);
    if phase_changed {
        lines.push(status_bar(next));
    }

    for (node, status) in graph.render(&next.nodes) {
        let before = previous.map(|p| p.status_of(node.id));
        if before != Some(status) && !(before.is_none() && status == UiNodeStatus::Initial) {
            lines.push(format!("  {} {} → {}", status_marker(status), node.id, status));
        }
    }

    if next.phase == RunPhase::Error {
        let already_shown = previous
            .map(|p| p.error_message == next.error_message && p.phase == RunPhase::Error)
            .unwrap_or(false);
        if let (Some(message), false) = (&next.error_message, already_shown) {
            lines.push(format!("  error: {}", message));
        }
    }

    lines
}

/// Static description of the pipeline topology
pub fn graph_lines(graph: &PipelineGraph) -> Vec<String> {
    let mut lines = vec!["Nodes:".to_string()];
    for node in graph.nodes() {
        lines.push(format!(
            "  {:<16} {:<14} {}",
            node.id,
            format!("{:?}", node.kind),
            node.metadata.description
        ));
    }

    lines.push(String::new());
    lines.push("Edges:".to_string());
    for edge in graph.edges() {
        let arrow = match edge.emphasis {
            EdgeEmphasis::Active => "══>",
            EdgeEmphasis::Dormant => "──>",
        };
        lines.push(format!("  {:<4} {} {} {}", edge.id, edge.source, arrow, edge.target));
    }

    lines
}

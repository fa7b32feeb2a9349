//! Static pipeline topology with a runtime status overlay.
//!
//! Nodes and edges are compile-time constants. The only runtime input is a
//! [`NodeStatusTable`], projected onto the nodes by [`PipelineGraph::render`].

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use thiserror::Error;

use crate::domain::UiNodeStatus;

/// Per-node status overlay, keyed by node id
pub type NodeStatusTable = BTreeMap<String, UiNodeStatus>;

/// Errors found while validating a topology
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(&'static str),

    #[error("Edge '{edge}' references unknown node '{node}'")]
    UnknownNode { edge: &'static str, node: &'static str },

    #[error("Pipeline topology contains a cycle")]
    Cycle,
}

/// Stage type of a pipeline node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    PromptInput,
    AudioInput,
    Classifier,
    Transcriber,
    Synthesizer,
    Reasoner,
    Output,
}

/// Immutable display metadata of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeMetadata {
    pub title: &'static str,
    pub description: &'static str,
    /// Layout position (x, y) in editor coordinates
    pub position: (i32, i32),
}

/// One pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PipelineNode {
    pub id: &'static str,
    pub kind: NodeKind,
    pub metadata: NodeMetadata,
}

/// Static visual emphasis of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeEmphasis {
    Active,
    Dormant,
}

/// Data dependency between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineEdge {
    pub id: &'static str,
    pub source: &'static str,
    pub target: &'static str,
    pub emphasis: EdgeEmphasis,
}

const fn node(
    id: &'static str,
    kind: NodeKind,
    title: &'static str,
    description: &'static str,
    position: (i32, i32),
) -> PipelineNode {
    PipelineNode {
        id,
        kind,
        metadata: NodeMetadata {
            title,
            description,
            position,
        },
    }
}

const fn edge(
    id: &'static str,
    source: &'static str,
    target: &'static str,
    emphasis: EdgeEmphasis,
) -> PipelineEdge {
    PipelineEdge {
        id,
        source,
        target,
        emphasis,
    }
}

static REFERENCE_NODES: [PipelineNode; 8] = [
    node(
        "user-prompt",
        NodeKind::PromptInput,
        "User Prompt",
        "Optional user soft prompt",
        (100, 60),
    ),
    node(
        "describe-audio",
        NodeKind::PromptInput,
        "Describe Audio",
        "Fixed audio description prompt",
        (100, 210),
    ),
    node(
        "audio-file",
        NodeKind::AudioInput,
        "Audio File",
        "Input audio file (.wav, .mp3, .m4a, .flac, .ogg)",
        (100, 370),
    ),
    node(
        "clap",
        NodeKind::Classifier,
        "CLAP",
        "Sound classification model",
        (490, 110),
    ),
    node(
        "whisper",
        NodeKind::Transcriber,
        "Whisper",
        "Whisper-large speech to text",
        (490, 340),
    ),
    node(
        "llm-layer",
        NodeKind::Synthesizer,
        "LLM Layer",
        "Llama-3.1-8B soft prompt synthesis",
        (760, 230),
    ),
    node(
        "mellow",
        NodeKind::Reasoner,
        "Mellow",
        "Fine-tuned audio reasoning model",
        (1030, 150),
    ),
    node(
        "json-output",
        NodeKind::Output,
        "JSON Output",
        "Final inference (speech + non-speech)",
        (1300, 250),
    ),
];

static REFERENCE_EDGES: [PipelineEdge; 13] = [
    edge("e1", "user-prompt", "clap", EdgeEmphasis::Active),
    edge("e2", "user-prompt", "llm-layer", EdgeEmphasis::Active),
    edge("e3", "describe-audio", "llm-layer", EdgeEmphasis::Dormant),
    edge("e4", "describe-audio", "clap", EdgeEmphasis::Dormant),
    edge("e5", "audio-file", "clap", EdgeEmphasis::Dormant),
    edge("e6", "audio-file", "whisper", EdgeEmphasis::Dormant),
    edge("e7", "clap", "llm-layer", EdgeEmphasis::Dormant),
    edge("e8", "whisper", "llm-layer", EdgeEmphasis::Dormant),
    edge("e9", "audio-file", "mellow", EdgeEmphasis::Dormant),
    edge("e10", "clap", "mellow", EdgeEmphasis::Dormant),
    edge("e11", "whisper", "mellow", EdgeEmphasis::Dormant),
    edge("e12", "llm-layer", "mellow", EdgeEmphasis::Active),
    edge("e13", "mellow", "json-output", EdgeEmphasis::Active),
];

/// Fixed pipeline DAG
#[derive(Debug, Clone, Copy)]
pub struct PipelineGraph {
    nodes: &'static [PipelineNode],
    edges: &'static [PipelineEdge],
}

impl PipelineGraph {
    /// The audio understanding pipeline the backend executes
    pub fn reference() -> Self {
        Self {
            nodes: &REFERENCE_NODES,
            edges: &REFERENCE_EDGES,
        }
    }

    pub fn nodes(&self) -> &'static [PipelineNode] {
        self.nodes
    }

    pub fn edges(&self) -> &'static [PipelineEdge] {
        self.edges
    }

    pub fn node(&self, id: &str) -> Option<&'static PipelineNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Table with every node at `initial`
    pub fn initial_table(&self) -> NodeStatusTable {
        self.nodes
            .iter()
            .map(|n| (n.id.to_string(), UiNodeStatus::Initial))
            .collect()
    }

    /// Overlay statuses onto the nodes, in declaration order.
    ///
    /// Nodes missing from `table` render as `initial`; table keys that name
    /// no node are ignored.
    pub fn render(&self, table: &NodeStatusTable) -> Vec<(&'static PipelineNode, UiNodeStatus)> {
        self.nodes
            .iter()
            .map(|n| (n, table.get(n.id).copied().unwrap_or_default()))
            .collect()
    }

    fn to_petgraph(&self) -> Result<DiGraph<&'static str, ()>, GraphError> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<&'static str, NodeIndex> = HashMap::new();
        let mut seen = HashSet::new();

        for n in self.nodes {
            if !seen.insert(n.id) {
                return Err(GraphError::DuplicateNode(n.id));
            }
            index.insert(n.id, graph.add_node(n.id));
        }

        for e in self.edges {
            let source = *index.get(e.source).ok_or(GraphError::UnknownNode {
                edge: e.id,
                node: e.source,
            })?;
            let target = *index.get(e.target).ok_or(GraphError::UnknownNode {
                edge: e.id,
                node: e.target,
            })?;
            graph.add_edge(source, target, ());
        }

        Ok(graph)
    }

    /// Check ids are unique, edges resolve, and the graph is acyclic
    pub fn validate(&self) -> Result<(), GraphError> {
        let graph = self.to_petgraph()?;
        if is_cyclic_directed(&graph) {
            return Err(GraphError::Cycle);
        }
        Ok(())
    }

    /// Node ids in dependency order
    pub fn topological_order(&self) -> Result<Vec<&'static str>, GraphError> {
        let graph = self.to_petgraph()?;
        let order = toposort(&graph, None).map_err(|_| GraphError::Cycle)?;
        Ok(order.into_iter().map(|idx| graph[idx]).collect())
    }

    /// Ids of nodes feeding directly into `id`
    pub fn upstream(&self, id: &str) -> Vec<&'static str> {
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.source)
            .collect()
    }
}

//! Pipeline graph model.
//!
//! The node/edge set is a fixed DAG; only the per-node status overlay
//! changes between polls.

pub mod model;

pub use model::{
    EdgeEmphasis, GraphError, NodeKind, NodeMetadata, NodeStatusTable, PipelineEdge,
    PipelineGraph, PipelineNode,
};

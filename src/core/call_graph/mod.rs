// src/core/call_graph/mod.rs
//! Call graph construction and everything that reads it
//!
//! Extractor output is folded into one `CallGraph` keyed by textual
//! `file::name` identity. The finished graph is read by the reporting,
//! visualization and traversal layers and never changes afterwards.

mod identity;
pub(crate) mod call_graph;
mod report;
mod visualize;
mod seeds;
mod traversal;

pub use identity::FunctionId;
pub use call_graph::{CallGraph, CallEdge};
pub use report::{function_listing, relationship_listing, snippet_sample, write_adjacency_artifact};
pub use visualize::{GraphVisualizer, VisualizationOutput};
pub use seeds::{FirstCandidate, SeedChooser, SeedResolution};
pub use traversal::{
    AlwaysContinue, ContinuationGate, LevelAnnotation, LevelReport, TerminationReason,
    TraversalReport, TraversalRunner,
};

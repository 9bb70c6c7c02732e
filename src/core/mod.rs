// src/core/mod.rs
mod engine;
mod discovery;
mod progress;
mod llm;

// Call graph model, reporting and traversal
mod call_graph;

// Language-specific extractors
mod languages;

pub use progress::LogProgress;

pub use call_graph::{
    FunctionId, function_listing, relationship_listing, snippet_sample,
    ContinuationGate, SeedChooser, SeedResolution, FirstCandidate, AlwaysContinue,
    LevelAnnotation, LevelReport, TerminationReason,
};

// Export the main engine
pub use engine::{AnalysisOutput, Engine, TraceOptions};

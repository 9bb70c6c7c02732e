//! Graph image output
//!
//! Selects a size-capped view of the call graph, writes it as Graphviz DOT and
//! asks the configured renderer for an image. Nothing here is allowed to fail
//! the run: problems are logged and the caller gets whatever was produced.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::VisualizationConfig;
use super::call_graph::CallGraph;
use super::identity::FunctionId;

/// The subset of the graph that gets drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphView<'a> {
    /// Nodes in first-appearance order
    pub nodes: Vec<&'a FunctionId>,
    /// Unique edges in insertion order
    pub edges: Vec<(&'a FunctionId, &'a FunctionId)>,
    /// Callers left out by the node cap
    pub dropped_callers: usize,
    /// Whether the global edge cap cut the view short
    pub edge_limit_hit: bool,
}

impl<'a> GraphView<'a> {
    /// Pick the most connected callers and cap their edges.
    ///
    /// Callers are ranked by out-degree, ties keeping discovery order.
    pub fn select(graph: &'a CallGraph, config: &VisualizationConfig) -> Self {
        let mut callers: Vec<(&FunctionId, &[FunctionId])> = graph.callers().collect();
        let dropped_callers = callers.len().saturating_sub(config.max_nodes);
        if dropped_callers > 0 {
            info!(
                "Graph too large ({} nodes), limiting to {} nodes for visualization",
                callers.len(), config.max_nodes
            );
            // Stable sort keeps discovery order among equal degrees
            callers.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
            callers.truncate(config.max_nodes);
        }

        let mut nodes = Vec::new();
        let mut seen_nodes = HashSet::new();
        let mut edges = Vec::new();
        let mut seen_edges = HashSet::new();
        let mut edge_limit_hit = false;

        'callers: for (caller, callees) in callers {
            if seen_nodes.insert(caller) {
                nodes.push(caller);
            }
            for callee in callees.iter().take(config.max_edges_per_node) {
                if !seen_edges.insert((caller, callee)) {
                    continue;
                }
                if edges.len() >= config.max_edges {
                    info!("Limiting graph to {} edges for performance", config.max_edges);
                    edge_limit_hit = true;
                    break 'callers;
                }
                if seen_nodes.insert(callee) {
                    nodes.push(callee);
                }
                edges.push((caller, callee));
            }
        }

        Self { nodes, edges, dropped_callers, edge_limit_hit }
    }

    /// Graphviz DOT text. Node ids are canonical identities; labels are the
    /// short display form. Callees nobody defines are drawn dashed.
    pub fn to_dot(&self, graph: &CallGraph) -> String {
        let mut lines = Vec::new();

        lines.push("digraph CallGraph {".to_string());
        lines.push("    rankdir=LR;".to_string());
        lines.push("    label=\"Function Call Graph (Limited View)\";".to_string());
        lines.push("    node [shape=box, style=filled, fontname=\"Helvetica\", fontsize=8];".to_string());
        lines.push("    edge [color=gray, arrowsize=0.8];".to_string());
        lines.push(String::new());

        for node in &self.nodes {
            let (fill, style) = if graph.contains(node) {
                ("skyblue", "filled")
            } else {
                ("#e0e0e0", "filled,dashed")
            };
            lines.push(format!(
                "    \"{}\" [label=\"{}\", fillcolor=\"{}\", style=\"{}\"];",
                escape_label(&node.canonical()),
                escape_label(&node.clean_label()),
                fill,
                style
            ));
        }

        lines.push(String::new());

        for (caller, callee) in &self.edges {
            lines.push(format!(
                "    \"{}\" -> \"{}\";",
                escape_label(&caller.canonical()),
                escape_label(&callee.canonical())
            ));
        }

        lines.push("}".to_string());
        lines.join("\n")
    }
}

/// Files produced by a visualization attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualizationOutput {
    pub dot_file: Option<PathBuf>,
    pub image_file: Option<PathBuf>,
    pub nodes: usize,
    pub edges: usize,
}

/// Best-effort renderer for the call graph
pub struct GraphVisualizer {
    config: VisualizationConfig,
}

impl GraphVisualizer {
    pub fn new(config: VisualizationConfig) -> Self {
        Self { config }
    }

    /// Write the DOT file and try to render an image next to it.
    /// Never returns an error; anything that goes wrong is logged.
    pub fn render(&self, graph: &CallGraph, output_dir: &Path) -> VisualizationOutput {
        let view = GraphView::select(graph, &self.config);
        info!("Graph has {} nodes and {} edges", view.nodes.len(), view.edges.len());

        let mut output = VisualizationOutput {
            nodes: view.nodes.len(),
            edges: view.edges.len(),
            ..Default::default()
        };

        let dot_path = output_dir.join(&self.config.dot_file);
        if let Err(e) = std::fs::write(&dot_path, view.to_dot(graph)) {
            warn!("Error writing graph file {}: {}", dot_path.display(), e);
            warn!("Continuing without visualization");
            return output;
        }
        output.dot_file = Some(dot_path.clone());

        let image_path = output_dir.join(&self.config.image_file);
        match self.run_renderer(&dot_path, &image_path) {
            Ok(()) => {
                info!("Graph saved as {}", image_path.display());
                output.image_file = Some(image_path);
            }
            Err(reason) => {
                warn!("Error generating visualization: {}", reason);
                info!("Graph description kept at {}", dot_path.display());
            }
        }

        output
    }

    fn run_renderer(&self, dot_path: &Path, image_path: &Path) -> std::result::Result<(), String> {
        debug!("Rendering {} with {}", dot_path.display(), self.config.renderer);

        let result = Command::new(&self.config.renderer)
            .arg("-Tpng")
            .arg(dot_path)
            .arg("-o")
            .arg(image_path)
            .output()
            .map_err(|e| format!("could not run '{}': {}", self.config.renderer, e))?;

        if result.status.success() {
            Ok(())
        } else {
            Err(format!(
                "'{}' exited with {}: {}",
                self.config.renderer,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ))
        }
    }
}

fn escape_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

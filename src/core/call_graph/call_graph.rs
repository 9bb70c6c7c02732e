// src/core/call_graph/call_graph.rs
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use rayon::prelude::*;
use tracing::debug;

use super::identity::FunctionId;
use super::super::languages::{ExtractorRegistry, FileExtraction};
use super::super::progress::{ProgressEvent, ProgressReporter};

/// Report extraction progress every N files (and on the last one)
const EXTRACTION_PROGRESS_INTERVAL: usize = 10;

/// Edge in the call graph representing one call site.
///
/// The callee is speculative: it is always named after the caller's file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallEdge {
    pub caller: FunctionId,
    pub callee: FunctionId,
}

impl CallEdge {
    pub fn new(caller: FunctionId, callee: FunctionId) -> Self {
        Self { caller, callee }
    }
}

/// Complete call graph for one analysis run. Built once, then read-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallGraph {
    /// Every function defined by some extractor
    functions: HashSet<FunctionId>,
    /// Caller -> callees, in discovery order, duplicates kept
    adjacency: HashMap<FunctionId, Vec<FunctionId>>,
    /// Callers in the order they first produced an edge
    caller_order: Vec<FunctionId>,
    /// Extracted source text per function
    snippets: HashMap<FunctionId, String>,
    edge_count: usize,
}

impl CallGraph {
    /// Extract every file and fold the results into one graph.
    ///
    /// Files are extracted independently (on the rayon pool when `parallel`)
    /// and folded sequentially in file order, so the result does not depend
    /// on scheduling.
    pub fn build_from_files(
        files: &[PathBuf],
        registry: &ExtractorRegistry,
        parallel: bool,
        progress: &dyn ProgressReporter,
    ) -> Self {
        let total = files.len();
        let processed = AtomicUsize::new(0);

        let extract_one = |path: &PathBuf| {
            let extraction = registry.extract(path);
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % EXTRACTION_PROGRESS_INTERVAL == 0 || done == total {
                progress.report(ProgressEvent::Extracted { processed: done, total, path });
            }
            extraction
        };

        let extractions: Vec<FileExtraction> = if parallel {
            files.par_iter().map(extract_one).collect()
        } else {
            files.iter().map(extract_one).collect()
        };

        let empty = extractions.iter().filter(|e| e.is_empty()).count();
        if empty > 0 {
            debug!("{} of {} files yielded no functions or calls", empty, total);
        }

        let mut builder = CallGraphBuilder::new();
        for extraction in extractions {
            builder.fold(extraction);
        }
        builder.finish()
    }

    pub fn contains(&self, function: &FunctionId) -> bool {
        self.functions.contains(function)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionId> {
        self.functions.iter()
    }

    /// Defined functions ordered by canonical identity
    pub fn sorted_functions(&self) -> Vec<&FunctionId> {
        let mut functions: Vec<&FunctionId> = self.functions.iter().collect();
        functions.sort();
        functions
    }

    /// Callees of `function` in call-site order
    pub fn callees(&self, function: &FunctionId) -> &[FunctionId] {
        self.adjacency.get(function).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Callers with their callee lists, in discovery order
    pub fn callers(&self) -> impl Iterator<Item = (&FunctionId, &[FunctionId])> {
        self.caller_order.iter()
            .map(move |caller| (caller, self.callees(caller)))
    }

    /// Callers ordered by canonical identity
    pub fn sorted_callers(&self) -> Vec<(&FunctionId, &[FunctionId])> {
        let mut callers: Vec<_> = self.callers().collect();
        callers.sort_by(|a, b| a.0.cmp(b.0));
        callers
    }

    pub fn snippet(&self, function: &FunctionId) -> Option<&str> {
        self.snippets.get(function).map(String::as_str)
    }

    /// Snippet text, or a placeholder naming the function when none was extracted
    pub fn snippet_or_placeholder(&self, function: &FunctionId) -> String {
        match self.snippet(function) {
            Some(code) => code.to_string(),
            None => format!("// Function {} code not available", function.clean_label()),
        }
    }

    /// Snippets in canonical identity order
    pub fn sorted_snippets(&self) -> Vec<(&FunctionId, &str)> {
        let mut snippets: Vec<_> = self.snippets.iter()
            .map(|(function, code)| (function, code.as_str()))
            .collect();
        snippets.sort_by(|a, b| a.0.cmp(b.0));
        snippets
    }

    /// Callees that no extractor defined (unresolved or external calls)
    pub fn shadow_nodes(&self) -> HashSet<&FunctionId> {
        self.adjacency.values()
            .flatten()
            .filter(|callee| !self.functions.contains(*callee))
            .collect()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn has_edges(&self) -> bool {
        self.edge_count > 0
    }

    pub fn get_statistics(&self) -> CallGraphStats {
        CallGraphStats {
            total_functions: self.functions.len(),
            total_calls: self.edge_count,
            callers: self.caller_order.len(),
            shadow_nodes: self.shadow_nodes().len(),
            snippets: self.snippets.len(),
            max_out_degree: self.adjacency.values().map(Vec::len).max().unwrap_or(0),
        }
    }
}

/// Folds per-file extractions into a `CallGraph`. The only writer of graph state.
#[derive(Debug, Default)]
pub struct CallGraphBuilder {
    graph: CallGraph,
}

impl CallGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union functions, append edges in order, merge snippets (later wins)
    pub fn fold(&mut self, extraction: FileExtraction) {
        let graph = &mut self.graph;

        graph.functions.extend(extraction.functions);

        for edge in extraction.edges {
            let callees = graph.adjacency.entry(edge.caller.clone()).or_insert_with(|| {
                graph.caller_order.push(edge.caller.clone());
                Vec::new()
            });
            callees.push(edge.callee);
            graph.edge_count += 1;
        }

        graph.snippets.extend(extraction.snippets);
    }

    pub fn finish(self) -> CallGraph {
        self.graph
    }
}

#[derive(Debug, Clone)]
pub struct CallGraphStats {
    pub total_functions: usize,
    pub total_calls: usize,
    pub callers: usize,
    pub shadow_nodes: usize,
    pub snippets: usize,
    pub max_out_degree: usize,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Graph from `(caller, callee)` name pairs, all in one file
    pub fn graph_from_pairs(file: &str, defined: &[&str], pairs: &[(&str, &str)]) -> CallGraph {
        let mut extraction = FileExtraction::new();
        for name in defined {
            extraction.add_function(FunctionId::new(file, *name));
        }
        for (caller, callee) in pairs {
            extraction.add_edge(&FunctionId::new(file, *caller), callee);
        }
        let mut builder = CallGraphBuilder::new();
        builder.fold(extraction);
        builder.finish()
    }
}

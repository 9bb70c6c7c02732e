// src/core/call_graph/report.rs
//! Console listings and the persisted adjacency-list artifact.
//!
//! Listings are elided for display; the artifact always carries the whole graph.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{CodelensError, Result};
use super::call_graph::CallGraph;
use super::identity::FunctionId;

pub const FUNCTIONS_HEADER: &str = "=== ALL FUNCTIONS ===";
pub const CALL_GRAPH_HEADER: &str = "=== FUNCTION CALL GRAPH ===";
pub const EDGE_SEPARATOR: &str = " --> ";
pub const CALLEE_SEPARATOR: &str = ", ";

/// A display listing, possibly truncated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Number of entries before elision
    pub total: usize,
    /// Entries actually shown
    pub lines: Vec<String>,
    noun: &'static str,
}

impl Listing {
    fn new(total: usize, lines: Vec<String>, noun: &'static str) -> Self {
        Self { total, lines, noun }
    }

    /// Entries left out of the display
    pub fn omitted(&self) -> usize {
        self.total.saturating_sub(self.lines.len())
    }

    pub fn is_elided(&self) -> bool {
        self.omitted() > 0
    }

    /// Trailing marker, only when something was left out
    pub fn more_marker(&self) -> Option<String> {
        self.is_elided()
            .then(|| format!("... and {} more {}.", self.omitted(), self.noun))
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_elided() {
            writeln!(f, "Found {} {}. Showing first {}:", self.total, self.noun, self.lines.len())?;
        }
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        if let Some(marker) = self.more_marker() {
            writeln!(f, "{}", marker)?;
        }
        Ok(())
    }
}

/// Sorted display labels of every defined function, first `limit` shown
pub fn function_listing(graph: &CallGraph, limit: usize) -> Listing {
    let functions = graph.sorted_functions();
    let lines = functions.iter()
        .take(limit)
        .map(|function| function.clean_label())
        .collect();
    Listing::new(functions.len(), lines, "functions")
}

/// `caller --> callees` lines for callers with at least one callee.
///
/// At most `limit` lines; each line shows `callees_per_line` callees and
/// ends in `, ...` when the caller has more.
pub fn relationship_listing(graph: &CallGraph, limit: usize, callees_per_line: usize) -> Listing {
    let callers: Vec<_> = graph.sorted_callers()
        .into_iter()
        .filter(|(_, callees)| !callees.is_empty())
        .collect();

    let lines = callers.iter()
        .take(limit)
        .map(|(caller, callees)| {
            let shown = callees.len().min(callees_per_line);
            let mut line = adjacency_line(caller, &callees[..shown]);
            if callees.len() > shown {
                line.push_str(", ...");
            }
            line
        })
        .collect();

    Listing::new(callers.len(), lines, "relationships")
}

/// First `count` snippets by identity, with how many were left out
pub fn snippet_sample(graph: &CallGraph, count: usize) -> (Vec<(&FunctionId, &str)>, usize) {
    let snippets = graph.sorted_snippets();
    let omitted = snippets.len().saturating_sub(count);
    (snippets.into_iter().take(count).collect(), omitted)
}

/// Full, unelided adjacency artifact text
pub fn render_adjacency_artifact(graph: &CallGraph) -> String {
    let mut out = String::new();
    out.push_str(FUNCTIONS_HEADER);
    out.push('\n');
    for function in graph.sorted_functions() {
        out.push_str(&function.clean_label());
        out.push('\n');
    }

    out.push('\n');
    out.push_str(CALL_GRAPH_HEADER);
    out.push('\n');
    for (caller, callees) in graph.sorted_callers() {
        if callees.is_empty() {
            continue;
        }
        out.push_str(&adjacency_line(caller, callees));
        out.push('\n');
    }
    out
}

/// Write the artifact. Failure here is fatal to the run, so it is reported
/// as an artifact error rather than a per-file one.
pub fn write_adjacency_artifact(graph: &CallGraph, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CodelensError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, render_adjacency_artifact(graph)).map_err(|source| CodelensError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

fn adjacency_line(caller: &FunctionId, callees: &[FunctionId]) -> String {
    let joined = callees.iter()
        .map(FunctionId::clean_label)
        .collect::<Vec<_>>()
        .join(CALLEE_SEPARATOR);
    format!("{}{}{}", caller.clean_label(), EDGE_SEPARATOR, joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::call_graph::call_graph::test_support::graph_from_pairs;

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("fn_{:03}", i)).collect()
    }

    #[test]
    fn test_function_listing_elides_after_limit() {
        let names = names(150);
        let defined: Vec<&str> = names.iter().map(String::as_str).collect();
        let graph = graph_from_pairs("/r/a.py", &defined, &[]);

        let listing = function_listing(&graph, 100);
        assert_eq!(listing.lines.len(), 100);
        assert_eq!(listing.more_marker().as_deref(), Some("... and 50 more functions."));
        assert_eq!(listing.lines[0], "a.py::fn_000");

        let rendered = listing.to_string();
        assert!(rendered.starts_with("Found 150 functions. Showing first 100:\n"));
    }

    #[test]
    fn test_function_listing_short_has_no_marker() {
        let names = names(80);
        let defined: Vec<&str> = names.iter().map(String::as_str).collect();
        let graph = graph_from_pairs("/r/a.py", &defined, &[]);

        let listing = function_listing(&graph, 100);
        assert_eq!(listing.lines.len(), 80);
        assert!(listing.more_marker().is_none());
        assert!(!listing.to_string().contains("more"));
    }

    #[test]
    fn test_relationship_line_truncates_callees() {
        let pairs: Vec<(&str, &str)> = ["a", "b", "c", "d", "e", "f", "g"]
            .iter()
            .map(|callee| ("main", *callee))
            .collect();
        let graph = graph_from_pairs("/r/m.py", &["main"], &pairs);

        let listing = relationship_listing(&graph, 50, 5);
        assert_eq!(
            listing.lines,
            vec!["m.py::main --> m.py::a, m.py::b, m.py::c, m.py::d, m.py::e, ..."]
        );
        assert!(!listing.is_elided());
    }

    #[test]
    fn test_relationship_listing_elides_lines() {
        let callers = names(60);
        let pairs: Vec<(&str, &str)> = callers.iter().map(|c| (c.as_str(), "leaf")).collect();
        let graph = graph_from_pairs("/r/a.py", &[], &pairs);

        let listing = relationship_listing(&graph, 50, 5);
        assert_eq!(listing.lines.len(), 50);
        assert_eq!(listing.more_marker().as_deref(), Some("... and 10 more relationships."));
    }

    #[test]
    fn test_artifact_is_complete() {
        let defined = names(150);
        let defined: Vec<&str> = defined.iter().map(String::as_str).collect();
        let callees = ["x1", "x2", "x3", "x4", "x5", "x6", "x7"];
        let pairs: Vec<(&str, &str)> = callees.iter().map(|c| ("fn_000", *c)).collect();
        let graph = graph_from_pairs("/r/a.py", &defined, &pairs);

        let text = render_adjacency_artifact(&graph);
        assert!(text.starts_with("=== ALL FUNCTIONS ===\na.py::fn_000\n"));
        assert!(text.contains("a.py::fn_149\n"));
        assert!(text.contains(
            "\n\n=== FUNCTION CALL GRAPH ===\na.py::fn_000 --> a.py::x1, a.py::x2, a.py::x3, a.py::x4, a.py::x5, a.py::x6, a.py::x7\n"
        ));
        assert!(!text.contains("more"));
    }

    #[test]
    fn test_scenario_artifact_on_disk() {
        let graph = graph_from_pairs("/r/a.py", &["f", "g"], &[("f", "g")]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("function_list.txt");

        write_adjacency_artifact(&graph, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "=== ALL FUNCTIONS ===\na.py::f\na.py::g\n\n=== FUNCTION CALL GRAPH ===\na.py::f --> a.py::g\n"
        );
    }

    #[test]
    fn test_artifact_write_failure_is_distinct() {
        let graph = graph_from_pairs("/r/a.py", &["f"], &[]);
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let result = write_adjacency_artifact(&graph, &blocker.join("function_list.txt"));
        assert!(matches!(result, Err(CodelensError::Artifact { .. })));
    }

    #[test]
    fn test_snippet_sample_counts_omitted() {
        let mut builder = crate::core::call_graph::call_graph::CallGraphBuilder::new();
        let mut extraction = crate::core::languages::FileExtraction::new();
        for name in ["a", "b", "c", "d", "e", "f", "g"] {
            let id = FunctionId::new("/r/s.py", name);
            extraction.add_function(id.clone());
            extraction.add_snippet(id, format!("def {}(): pass", name));
        }
        builder.fold(extraction);
        let graph = builder.finish();

        let (sample, omitted) = snippet_sample(&graph, 5);
        assert_eq!(sample.len(), 5);
        assert_eq!(omitted, 2);
        assert_eq!(sample[0].1, "def a(): pass");
    }
}

// src/core/call_graph/seeds.rs
use std::collections::HashSet;
use tracing::{info, warn};

use super::call_graph::CallGraph;
use super::identity::FunctionId;

/// Picks one function when a seed fragment is ambiguous.
///
/// Returning `None` skips the fragment.
pub trait SeedChooser: Send + Sync {
    fn choose(&self, fragment: &str, candidates: &[FunctionId]) -> Option<FunctionId>;
}

/// Always takes the first candidate (candidates arrive sorted)
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCandidate;

impl SeedChooser for FirstCandidate {
    fn choose(&self, _fragment: &str, candidates: &[FunctionId]) -> Option<FunctionId> {
        candidates.first().cloned()
    }
}

/// Outcome of resolving every fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedResolution {
    /// Resolved seeds, de-duplicated, in fragment order
    pub seeds: Vec<FunctionId>,
    /// Fragments that matched nothing
    pub missing: Vec<String>,
    /// Ambiguous fragments the chooser declined
    pub skipped: Vec<String>,
}

impl SeedResolution {
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

/// Known functions whose canonical identity or display label contains `fragment`
pub fn find_candidates<'g>(graph: &'g CallGraph, fragment: &str) -> Vec<&'g FunctionId> {
    let mut matches: Vec<&FunctionId> = graph.functions()
        .filter(|function| {
            function.canonical().contains(fragment) || function.clean_label().contains(fragment)
        })
        .collect();
    matches.sort();
    matches
}

/// Resolve user fragments to seed functions.
///
/// A single match is taken directly; several go to `chooser`, which sees at
/// most `max_choices` of them.
pub fn resolve_seeds<S: AsRef<str>>(
    graph: &CallGraph,
    fragments: &[S],
    chooser: &dyn SeedChooser,
    max_choices: usize,
) -> SeedResolution {
    let mut resolution = SeedResolution::default();
    let mut chosen = HashSet::new();

    for fragment in fragments {
        let fragment = fragment.as_ref().trim();
        if fragment.is_empty() {
            continue;
        }

        let candidates = find_candidates(graph, fragment);
        let picked = match candidates.as_slice() {
            [] => {
                warn!("No match found for '{}'", fragment);
                resolution.missing.push(fragment.to_string());
                continue;
            }
            [only] => {
                info!("Found match for '{}': {}", fragment, only.clean_label());
                (*only).clone()
            }
            many => {
                let shown: Vec<FunctionId> = many.iter()
                    .take(max_choices.max(1))
                    .map(|f| (*f).clone())
                    .collect();
                match chooser.choose(fragment, &shown) {
                    Some(choice) if shown.contains(&choice) => choice,
                    _ => {
                        info!("Skipping '{}'", fragment);
                        resolution.skipped.push(fragment.to_string());
                        continue;
                    }
                }
            }
        };

        if chosen.insert(picked.clone()) {
            resolution.seeds.push(picked);
        }
    }

    resolution
}

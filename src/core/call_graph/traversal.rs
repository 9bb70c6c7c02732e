// src/core/call_graph/traversal.rs
//! Bounded breadth-first traversal from seed functions.
//!
//! `Traversal` is a plain state machine: it hands out one full level at a
//! time and then waits to be resumed with a continue/stop decision. The async
//! `TraversalRunner` drives it, attaching summaries and asking a
//! `ContinuationGate` between levels, so the same engine serves scripted and
//! interactive callers.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::TraversalConfig;
use crate::core::llm::{chunk_functions, Summarizer};
use crate::error::{CodelensError, Result};
use super::call_graph::CallGraph;
use super::identity::FunctionId;
use super::seeds::{resolve_seeds, SeedChooser, SeedResolution};

/// Why a traversal stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    NoValidSeeds,
    MaxDepthReached,
    Exhausted,
    UserStopped,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::NoValidSeeds => "no valid seeds",
            TerminationReason::MaxDepthReached => "max depth reached",
            TerminationReason::Exhausted => "no further levels to explore",
            TerminationReason::UserStopped => "stopped by user",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalPhase {
    Idle,
    /// The frontier at this depth is ready to be processed
    LevelReady(usize),
    /// The level at this depth was processed; waiting for a decision
    AwaitingContinuation(usize),
    Terminated(TerminationReason),
}

/// One processed breadth layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub depth: usize,
    /// Functions in the layer with their source, or a placeholder
    pub entries: Vec<(FunctionId, String)>,
}

impl Level {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionId> {
        self.entries.iter().map(|(function, _)| function)
    }
}

pub struct Traversal<'g> {
    graph: &'g CallGraph,
    max_depth: usize,
    /// Visited functions with the depth they were first enqueued at
    visited: HashMap<FunctionId, usize>,
    frontier: VecDeque<FunctionId>,
    phase: TraversalPhase,
}

impl<'g> Traversal<'g> {
    pub fn new(graph: &'g CallGraph, max_depth: usize) -> Self {
        Self {
            graph,
            max_depth,
            visited: HashMap::new(),
            frontier: VecDeque::new(),
            phase: TraversalPhase::Idle,
        }
    }

    pub fn phase(&self) -> TraversalPhase {
        self.phase
    }

    /// Depth at which a function was first reached, if it was
    #[cfg(test)]
    pub fn depth_of(&self, function: &FunctionId) -> Option<usize> {
        self.visited.get(function).copied()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Enqueue the depth-0 frontier. Seeds are marked visited as they are
    /// enqueued, so a repeated seed is only processed once.
    pub fn seed<I>(&mut self, seeds: I) -> Result<TraversalPhase>
    where
        I: IntoIterator<Item = FunctionId>,
    {
        if self.phase != TraversalPhase::Idle {
            return Err(CodelensError::Traversal(format!(
                "cannot seed a traversal in phase {:?}", self.phase
            )));
        }

        for seed in seeds {
            self.enqueue(seed, 0);
        }

        self.phase = if self.frontier.is_empty() {
            TraversalPhase::Terminated(TerminationReason::NoValidSeeds)
        } else {
            TraversalPhase::LevelReady(0)
        };
        Ok(self.phase)
    }

    /// Dequeue the whole current frontier, expand it one step and return it.
    ///
    /// Afterwards the traversal either waits for a decision or has terminated
    /// because nothing is left or the depth limit was reached.
    pub fn next_level(&mut self) -> Result<Level> {
        let TraversalPhase::LevelReady(depth) = self.phase else {
            return Err(CodelensError::Traversal(format!(
                "no level is ready in phase {:?}", self.phase
            )));
        };

        let layer: Vec<FunctionId> = self.frontier.drain(..).collect();
        let mut entries = Vec::with_capacity(layer.len());

        for function in layer {
            for callee in self.graph.callees(&function) {
                if !self.visited.contains_key(callee) {
                    self.enqueue(callee.clone(), depth + 1);
                }
            }
            let code = self.graph.snippet_or_placeholder(&function);
            entries.push((function, code));
        }

        self.phase = if self.frontier.is_empty() {
            TraversalPhase::Terminated(TerminationReason::Exhausted)
        } else if depth + 1 >= self.max_depth {
            TraversalPhase::Terminated(TerminationReason::MaxDepthReached)
        } else {
            TraversalPhase::AwaitingContinuation(depth)
        };

        Ok(Level { depth, entries })
    }

    /// Apply the continue/stop decision for the level just processed
    pub fn resume(&mut self, proceed: bool) -> Result<TraversalPhase> {
        let TraversalPhase::AwaitingContinuation(depth) = self.phase else {
            return Err(CodelensError::Traversal(format!(
                "nothing to resume in phase {:?}", self.phase
            )));
        };

        self.phase = if proceed {
            TraversalPhase::LevelReady(depth + 1)
        } else {
            TraversalPhase::Terminated(TerminationReason::UserStopped)
        };
        Ok(self.phase)
    }

    fn enqueue(&mut self, function: FunctionId, depth: usize) {
        if self.visited.contains_key(&function) {
            return;
        }
        self.visited.insert(function.clone(), depth);
        self.frontier.push_back(function);
    }
}

/// What is shown for a level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelAnnotation {
    /// Result lines from the summarizer, including per-chunk error lines
    Summaries(Vec<String>),
    /// Display labels, when no summarizer is configured
    Labels(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
    pub level: Level,
    pub annotation: LevelAnnotation,
}

impl LevelReport {
    /// 1-based number used in output
    pub fn number(&self) -> usize {
        self.level.depth + 1
    }
}

/// Decides whether to go one level deeper.
///
/// The notification hooks let interactive callers show progress; they are
/// called for every level, including the last one.
pub trait ContinuationGate: Send + Sync {
    fn confirm_continue(&self, report: &LevelReport) -> bool;

    fn seeds_resolved(&self, _seeds: &SeedResolution) {}

    fn level_completed(&self, _report: &LevelReport) {}
}

/// Gate that always continues
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysContinue;

impl ContinuationGate for AlwaysContinue {
    fn confirm_continue(&self, _report: &LevelReport) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalReport {
    pub seeds: SeedResolution,
    pub levels: Vec<LevelReport>,
    pub reason: TerminationReason,
}

/// Drives a `Traversal` end to end
pub struct TraversalRunner<'a> {
    graph: &'a CallGraph,
    config: TraversalConfig,
    summarizer: Option<&'a dyn Summarizer>,
    call_timeout: Duration,
}

impl<'a> TraversalRunner<'a> {
    pub fn new(graph: &'a CallGraph, config: TraversalConfig) -> Self {
        Self {
            graph,
            config,
            summarizer: None,
            call_timeout: Duration::from_secs(60),
        }
    }

    /// Summarize each level with `summarizer`, bounding every call by `timeout`
    pub fn with_summarizer(mut self, summarizer: &'a dyn Summarizer, timeout: Duration) -> Self {
        self.summarizer = Some(summarizer);
        self.call_timeout = timeout;
        self
    }

    pub async fn run<S: AsRef<str>>(
        &self,
        fragments: &[S],
        description: &str,
        chooser: &dyn SeedChooser,
        gate: &dyn ContinuationGate,
    ) -> Result<TraversalReport> {
        let seeds = resolve_seeds(self.graph, fragments, chooser, self.config.max_choices);
        let mut traversal = Traversal::new(self.graph, self.config.max_depth);
        let mut levels = Vec::new();

        gate.seeds_resolved(&seeds);
        let mut phase = traversal.seed(seeds.seeds.iter().cloned())?;
        if phase == TraversalPhase::LevelReady(0) {
            info!("Starting BFS analysis with {} seed functions", seeds.seeds.len());
        }

        let reason = loop {
            match phase {
                TraversalPhase::Terminated(reason) => break reason,
                TraversalPhase::LevelReady(_) => {
                    let level = traversal.next_level()?;
                    info!(
                        "Level {}: {} functions ({} visited so far)",
                        level.depth + 1, level.entries.len(), traversal.visited_count()
                    );

                    let annotation = self.annotate(&level, description).await;
                    let report = LevelReport { level, annotation };
                    gate.level_completed(&report);

                    phase = traversal.phase();
                    if let TraversalPhase::AwaitingContinuation(_) = phase {
                        let proceed = gate.confirm_continue(&report);
                        phase = traversal.resume(proceed)?;
                    }
                    levels.push(report);
                }
                TraversalPhase::Idle | TraversalPhase::AwaitingContinuation(_) => {
                    return Err(CodelensError::Traversal(format!(
                        "traversal stalled in phase {:?}", phase
                    )));
                }
            }
        };

        info!("Traversal finished after {} levels: {}", levels.len(), reason);
        Ok(TraversalReport { seeds, levels, reason })
    }

    async fn annotate(&self, level: &Level, description: &str) -> LevelAnnotation {
        let Some(summarizer) = self.summarizer else {
            return LevelAnnotation::Labels(level.functions().map(FunctionId::clean_label).collect());
        };

        let chunks = chunk_functions(description, level.entries.clone(), self.config.chunk_char_budget);
        let mut lines = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let outcome = tokio::time::timeout(self.call_timeout, summarizer.summarize(description, chunk)).await;
            match outcome {
                Ok(Ok(result)) => lines.extend(result),
                Ok(Err(e)) => {
                    warn!("Summarizer failed on chunk {}: {}", index + 1, e);
                    lines.push(format!("Error in chunk {}: {}", index + 1, e));
                }
                Err(_) => {
                    warn!("Summarizer timed out on chunk {}", index + 1);
                    lines.push(format!(
                        "Error in chunk {}: timed out after {}s",
                        index + 1,
                        self.call_timeout.as_secs()
                    ));
                }
            }
        }

        LevelAnnotation::Summaries(lines)
    }
}

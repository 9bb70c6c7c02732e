// src/core/engine.rs
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use super::call_graph::{
    write_adjacency_artifact, CallGraph, ContinuationGate, GraphVisualizer, SeedChooser,
    TraversalReport, TraversalRunner, VisualizationOutput,
};
use super::discovery::FileDiscovery;
use super::languages::ExtractorRegistry;
use super::llm::{create_summarizer, Summarizer};
use super::progress::ProgressReporter;

/// Default file written by `init`
pub const DEFAULT_CONFIG_FILE: &str = "codelens.toml";

/// A built graph together with what it was built from
pub struct Analysis {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub graph: CallGraph,
}

/// What `analyze` persisted
pub struct AnalysisOutput {
    pub analysis: Analysis,
    pub artifact: PathBuf,
    pub visualization: Option<VisualizationOutput>,
}

/// Options for one traversal run
pub struct TraceOptions<'a> {
    pub fragments: &'a [String],
    pub description: &'a str,
    pub max_depth: Option<usize>,
}

/// Main orchestration engine: discovery, extraction, reporting, traversal
pub struct Engine {
    config: Config,
    discovery: FileDiscovery,
    registry: ExtractorRegistry,
    summarizer: Option<Box<dyn Summarizer>>,
}

impl Engine {
    /// Create an engine from a config file, or the default lookup
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let discovery = FileDiscovery::new(&config.discovery)
            .context("Invalid discovery configuration")?;
        let registry = ExtractorRegistry::new(&config.extraction)
            .context("Failed to set up language extractors")?;
        debug!("Extractors ready for: {}", registry.supported_extensions().join(", "));

        let summarizer = if config.llm.enabled {
            match create_summarizer(&config.llm) {
                Ok(summarizer) => {
                    info!("LLM summaries enabled: {} ({})", summarizer.provider_name(), summarizer.model_name());
                    Some(summarizer)
                }
                Err(e) => {
                    warn!("Failed to initialize summarizer: {}", e);
                    warn!("Continuing without LLM summaries");
                    None
                }
            }
        } else {
            debug!("LLM integration disabled");
            None
        };

        Ok(Self { config, discovery, registry, summarizer })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write the default configuration into `path` (or the current directory)
    pub fn init(&self, path: Option<PathBuf>) -> Result<PathBuf> {
        let dir = path.unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let target = dir.join(DEFAULT_CONFIG_FILE);
        if target.exists() {
            bail!("{} already exists", target.display());
        }

        Config::default().save(&target)?;
        info!("Wrote default configuration to {}", target.display());
        Ok(target)
    }

    /// Discover and extract every file under `root` into one graph
    pub fn build_graph(&self, root: &Path, progress: &dyn ProgressReporter) -> Result<Analysis> {
        let files = self.discovery.discover(root, progress)?;
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        if files.is_empty() {
            warn!("No supported source files found under {}", root.display());
        }

        let graph = CallGraph::build_from_files(
            &files,
            &self.registry,
            self.config.extraction.parallel,
            progress,
        );

        let stats = graph.get_statistics();
        info!(
            "Built call graph: {} functions, {} calls from {} callers, {} unresolved callees",
            stats.total_functions, stats.total_calls, stats.callers, stats.shadow_nodes
        );
        debug!("{} snippets extracted, widest caller has {} calls", stats.snippets, stats.max_out_degree);

        Ok(Analysis { root, files, graph })
    }

    /// Build the graph, persist the adjacency artifact and draw the graph.
    ///
    /// Artifact failures abort; visualization failures never do.
    pub fn analyze(
        &self,
        root: &Path,
        output: Option<PathBuf>,
        visualize: bool,
        progress: &dyn ProgressReporter,
    ) -> Result<AnalysisOutput> {
        let analysis = self.build_graph(root, progress)?;

        let artifact = output.unwrap_or_else(|| self.config.report.output_file.clone());
        write_adjacency_artifact(&analysis.graph, &artifact)?;
        info!("Results written to {}", artifact.display());

        let visualization = if !visualize || !self.config.visualization.enabled {
            debug!("Visualization disabled");
            None
        } else if !analysis.graph.has_edges() {
            info!("No function call relationships found to visualize");
            None
        } else {
            debug!("Drawing {} calls", analysis.graph.edge_count());
            let output_dir = artifact.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let visualizer = GraphVisualizer::new(self.config.visualization.clone());
            Some(visualizer.render(&analysis.graph, output_dir))
        };

        Ok(AnalysisOutput { analysis, artifact, visualization })
    }

    /// Run the bounded traversal over an already built graph
    pub async fn trace(
        &self,
        graph: &CallGraph,
        options: TraceOptions<'_>,
        chooser: &dyn SeedChooser,
        gate: &dyn ContinuationGate,
    ) -> Result<TraversalReport> {
        let mut traversal_config = self.config.traversal.clone();
        if let Some(depth) = options.max_depth {
            if depth == 0 {
                bail!("--max-depth must be at least 1");
            }
            traversal_config.max_depth = depth;
        }

        let mut runner = TraversalRunner::new(graph, traversal_config);
        if let Some(summarizer) = self.summarizer.as_deref() {
            runner = runner.with_summarizer(summarizer, Duration::from_secs(self.config.llm.timeout_secs));
        }

        let report = runner
            .run(options.fragments, options.description, chooser, gate)
            .await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::call_graph::{
        AlwaysContinue, FirstCandidate, FunctionId, LevelAnnotation, TerminationReason,
    };
    use crate::core::progress::NoProgress;

    fn engine_in(dir: &Path) -> Engine {
        let mut config = Config::default();
        config.report.output_file = dir.join("out").join("function_list.txt");
        config.visualization.renderer = "codelens-renderer-that-does-not-exist".to_string();
        Engine::from_config(config).unwrap()
    }

    fn project(dir: &Path) -> PathBuf {
        let root = dir.join("project");
        std::fs::create_dir_all(root.join("node_modules")).unwrap();
        std::fs::write(root.join("a.py"), "def f():\n    g()\n\ndef g():\n    pass\n").unwrap();
        std::fs::write(root.join("node_modules").join("dep.js"), "function dep() { x(); }\n").unwrap();
        root
    }

    #[test]
    fn test_analyze_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let root = project(dir.path());
        let engine = engine_in(dir.path());

        let output = engine.analyze(&root, None, true, &NoProgress).unwrap();

        assert_eq!(output.analysis.files.len(), 1);
        let a = output.analysis.root.join("a.py");
        assert!(output.analysis.graph.contains(&FunctionId::new(&a, "f")));
        let text = std::fs::read_to_string(&output.artifact).unwrap();
        assert!(text.ends_with("=== FUNCTION CALL GRAPH ===\na.py::f --> a.py::g\n"));

        let visualization = output.visualization.unwrap();
        assert!(visualization.dot_file.is_some());
        assert!(visualization.image_file.is_none());
    }

    #[test]
    fn test_analyze_fails_on_unwritable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let root = project(dir.path());
        let engine = engine_in(dir.path());
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let result = engine.analyze(&root, Some(blocker.join("list.txt")), false, &NoProgress);
        assert!(result.is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());

        let written = engine.init(Some(dir.path().to_path_buf())).unwrap();
        assert!(Config::load(&written).is_ok());
        assert!(engine.init(Some(dir.path().to_path_buf())).is_err());
    }

    #[tokio::test]
    async fn test_trace_over_built_graph() {
        let dir = tempfile::tempdir().unwrap();
        let root = project(dir.path());
        let engine = engine_in(dir.path());
        let analysis = engine.build_graph(&root, &NoProgress).unwrap();

        let fragments = vec!["a.py::f".to_string()];
        let options = TraceOptions { fragments: &fragments, description: "", max_depth: None };
        let report = engine.trace(&analysis.graph, options, &FirstCandidate, &AlwaysContinue).await.unwrap();

        assert_eq!(report.reason, TerminationReason::Exhausted);
        assert_eq!(report.levels.len(), 2);
        assert_eq!(
            report.levels[1].annotation,
            LevelAnnotation::Labels(vec!["a.py::g".to_string()])
        );
    }

    #[tokio::test]
    async fn test_trace_rejects_zero_depth() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        let graph = CallGraph::default();
        let fragments: Vec<String> = Vec::new();
        let options = TraceOptions { fragments: &fragments, description: "", max_depth: Some(0) };

        assert!(engine.trace(&graph, options, &FirstCandidate, &AlwaysContinue).await.is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CodelensError, Result};

/// Environment variable consulted when `llm.api_key` is not set
pub const API_KEY_ENV: &str = "CODELENS_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source tree walking and exclusion rules
    pub discovery: DiscoveryConfig,

    /// Per-language extractor limits
    pub extraction: ExtractionConfig,

    /// Console listings and the persisted adjacency file
    pub report: ReportConfig,

    /// Graph image output
    pub visualization: VisualizationConfig,

    /// Bounded breadth-first traversal
    pub traversal: TraversalConfig,

    /// Summarization service settings
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File extensions to analyze (without the leading dot)
    pub extensions: Vec<String>,

    /// Directory fragments; a directory whose path relative to the root
    /// contains one of these (case-insensitive) is not descended into
    pub excluded_dirs: Vec<String>,

    /// Regexes matched against the file name
    pub excluded_file_patterns: Vec<String>,

    /// Maximum file size to analyze (in bytes)
    pub max_file_size: u64,

    /// Report discovery progress every N collected files
    pub progress_interval: usize,

    /// Also honour .gitignore files while walking
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum bytes scanned when matching a function body's braces
    pub max_brace_scan: usize,

    /// Maximum call edges emitted per heuristic function
    pub max_calls_per_function: usize,

    /// Number of leading lines inspected by the minified-file probe
    pub minified_probe_lines: usize,

    /// A probed line longer than this marks the file as minified
    pub minified_line_length: usize,

    /// Extract files on the rayon pool
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub function_list_limit: usize,
    pub relationship_limit: usize,
    pub callees_per_line: usize,
    /// Where the full adjacency-list artifact is written
    pub output_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub enabled: bool,
    /// Maximum callers kept in the rendered subgraph
    pub max_nodes: usize,
    pub max_edges_per_node: usize,
    /// Hard stop on rendered edges
    pub max_edges: usize,
    pub dot_file: PathBuf,
    pub image_file: PathBuf,
    /// Graphviz executable used to turn the DOT file into an image
    pub renderer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    pub max_depth: usize,
    /// Character budget for one summarization prompt
    pub chunk_char_budget: usize,
    /// Candidates shown when a seed fragment is ambiguous
    pub max_choices: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Whether to annotate traversal levels with summaries
    pub enabled: bool,

    /// Provider (openai, gemini)
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini", "gemini-1.5-pro-002")
    pub model: String,

    /// API key; falls back to the CODELENS_API_KEY environment variable
    pub api_key: Option<String>,

    /// Base URL (for OpenAI-compatible servers)
    pub base_url: Option<String>,

    /// Maximum tokens for LLM responses
    pub max_tokens: Option<u32>,

    /// Temperature for LLM responses (0.0 to 1.0)
    pub temperature: Option<f32>,

    /// Per-call timeout
    pub timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let excluded_dirs = [
            "node_modules", "dist", "build", "venv", ".git", "__pycache__",
            ".gradle", ".idea", ".vscode", "vendor", "bin", "obj", "target",
            ".dart_tool", ".pub-cache", "android/app/build", "ios/Pods",
            "lib/generated", "gen", "out", "cmake-build", "bazel-out",
            "build-output", "generated_plugin_registrant",
        ];
        let excluded_file_patterns = [
            r".*\.min\.js$",
            r".*\.bundle\.js$",
            r".*generated.*\.dart$",
            r".*\.g\.dart$",
            r".*\.freezed\.dart$",
            r".*\.pb\..*$",
            r".*_generated\..*$",
            r"R\.java$",
            r"BuildConfig\.java$",
            r".*\.designer\.cs$",
            r"AndroidManifest\.xml$",
        ];

        Self {
            extensions: vec!["py".to_string(), "java".to_string(), "js".to_string()],
            excluded_dirs: excluded_dirs.iter().map(|s| s.to_string()).collect(),
            excluded_file_patterns: excluded_file_patterns.iter().map(|s| s.to_string()).collect(),
            max_file_size: 1024 * 1024, // 1MB
            progress_interval: 50,
            respect_gitignore: false,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_brace_scan: 20_000,
            max_calls_per_function: 50,
            minified_probe_lines: 20,
            minified_line_length: 500,
            parallel: true,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            function_list_limit: 100,
            relationship_limit: 50,
            callees_per_line: 5,
            output_file: PathBuf::from("function_list.txt"),
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_nodes: 200,
            max_edges_per_node: 10,
            max_edges: 500,
            dot_file: PathBuf::from("function_call_graph.dot"),
            image_file: PathBuf::from("function_call_graph.png"),
            renderer: "dot".to_string(),
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            chunk_char_budget: 30_000,
            max_choices: 10,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: Some(2000),
            temperature: Some(0.3),
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// API key from the config, or from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CodelensError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CodelensError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = [
                    "Codelens.toml",
                    "codelens.toml",
                    ".codelens.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.discovery.extensions.is_empty() {
            return Err(CodelensError::Config("discovery.extensions must not be empty".to_string()));
        }
        if self.traversal.max_depth == 0 {
            return Err(CodelensError::Config("traversal.max_depth must be at least 1".to_string()));
        }
        if self.traversal.chunk_char_budget == 0 {
            return Err(CodelensError::Config("traversal.chunk_char_budget must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_limits() {
        let config = Config::default();
        assert_eq!(config.discovery.max_file_size, 1024 * 1024);
        assert_eq!(config.discovery.excluded_dirs.len(), 24);
        assert_eq!(config.extraction.max_brace_scan, 20_000);
        assert_eq!(config.traversal.max_depth, 8);
        assert_eq!(config.visualization.max_edges, 500);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codelens.toml");
        std::fs::write(&path, "[traversal]\nmax_depth = 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.traversal.max_depth, 3);
        assert_eq!(config.traversal.chunk_char_budget, 30_000);
        assert_eq!(config.report.function_list_limit, 100);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codelens.toml");
        let mut config = Config::default();
        config.llm.provider = "gemini".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.llm.provider, "gemini");
    }

    #[test]
    fn test_zero_depth_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codelens.toml");
        std::fs::write(&path, "[traversal]\nmax_depth = 0\n").unwrap();

        assert!(matches!(Config::load(&path), Err(CodelensError::Config(_))));
    }
}

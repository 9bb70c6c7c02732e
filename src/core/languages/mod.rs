//! Language-specific call extractors
//!
//! Each language gets its own module behind the same `LanguageExtractor`
//! interface. Python is parsed with Tree-sitter; Java and JavaScript use
//! regex and brace-matching heuristics that accept known false positives.

mod heuristics;
mod java;
mod javascript;
mod python;

pub use heuristics::{looks_minified, match_brace_span, CallScanner};
pub use java::JavaExtractor;
pub use javascript::JavaScriptExtractor;
pub use python::PythonExtractor;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::config::ExtractionConfig;
use crate::error::Result;
use super::call_graph::{CallEdge, FunctionId};

/// Everything one extractor learned from one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileExtraction {
    /// Defined functions, de-duplicated, in discovery order
    pub functions: Vec<FunctionId>,
    /// Call edges in discovery order; duplicates are kept
    pub edges: Vec<CallEdge>,
    /// Source text per defined function (best effort)
    pub snippets: HashMap<FunctionId, String>,
    seen: HashSet<FunctionId>,
}

impl FileExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition; repeated definitions collapse onto one identity
    pub fn add_function(&mut self, function: FunctionId) {
        if self.seen.insert(function.clone()) {
            self.functions.push(function);
        }
    }

    pub fn add_edge(&mut self, caller: &FunctionId, callee_name: &str) {
        self.edges.push(CallEdge::new(caller.clone(), FunctionId::callee_of(caller, callee_name)));
    }

    pub fn add_snippet(&mut self, function: FunctionId, code: String) {
        self.snippets.insert(function, code);
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.edges.is_empty() && self.snippets.is_empty()
    }
}

/// Trait that all language extractors implement
pub trait LanguageExtractor: Send + Sync {
    /// Extract definitions, calls and snippets from already-loaded source
    fn extract_source(&self, content: &str, file_path: &Path) -> Result<FileExtraction>;

    /// Get the file extensions this extractor handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;

    /// Read and extract one file. Failures are logged and yield an empty
    /// extraction so one bad file cannot abort a run.
    fn extract(&self, file_path: &Path) -> FileExtraction {
        match read_source(file_path).and_then(|content| self.extract_source(&content, file_path)) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Error parsing {} file {}: {}", self.language_name(), file_path.display(), e);
                FileExtraction::new()
            }
        }
    }
}

/// Read a source file, replacing invalid UTF-8 rather than failing
pub fn read_source(file_path: &Path) -> Result<String> {
    let bytes = std::fs::read(file_path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extension-keyed set of extractors
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn LanguageExtractor>>,
}

impl ExtractorRegistry {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let all: Vec<Arc<dyn LanguageExtractor>> = vec![
            Arc::new(PythonExtractor::new()),
            Arc::new(JavaExtractor::new(config)?),
            Arc::new(JavaScriptExtractor::new(config)?),
        ];

        let mut extractors = HashMap::new();
        for extractor in all {
            for extension in extractor.file_extensions() {
                extractors.insert(extension.to_string(), Arc::clone(&extractor));
            }
        }

        Ok(Self { extractors })
    }

    /// Extractor responsible for `path`, chosen by extension
    pub fn for_path(&self, path: &Path) -> Option<&dyn LanguageExtractor> {
        let extension = path.extension()?.to_str()?;
        self.extractors.get(extension).map(|extractor| extractor.as_ref())
    }

    /// Extract a file with whichever extractor handles it
    pub fn extract(&self, path: &Path) -> FileExtraction {
        match self.for_path(path) {
            Some(extractor) => extractor.extract(path),
            None => FileExtraction::new(),
        }
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.extractors.keys().map(|s| s.as_str()).collect();
        extensions.sort_unstable();
        extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dispatches_by_extension() {
        let registry = ExtractorRegistry::new(&ExtractionConfig::default()).unwrap();
        assert_eq!(registry.supported_extensions(), vec!["java", "js", "py"]);
        assert_eq!(registry.for_path(Path::new("a/b.py")).unwrap().language_name(), "python");
        assert_eq!(registry.for_path(Path::new("Main.java")).unwrap().language_name(), "java");
        assert!(registry.for_path(Path::new("README.md")).is_none());
    }

    #[test]
    fn test_unreadable_file_yields_empty_extraction() {
        let registry = ExtractorRegistry::new(&ExtractionConfig::default()).unwrap();
        let extraction = registry.extract(Path::new("/definitely/not/here.py"));
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_duplicate_definitions_collapse() {
        let mut extraction = FileExtraction::new();
        extraction.add_function(FunctionId::new("a.py", "f"));
        extraction.add_function(FunctionId::new("a.py", "f"));
        assert_eq!(extraction.functions.len(), 1);
    }
}

use std::path::{Path, PathBuf};
use ignore::WalkBuilder;
use regex::RegexSet;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::error::{CodelensError, Result};
use super::progress::{ProgressEvent, ProgressReporter, SkipReason};

/// Directory-fragment exclusion, shared with the walker's entry filter
#[derive(Debug, Clone)]
struct DirExclusion {
    root: PathBuf,
    fragments: Vec<String>,
}

impl DirExclusion {
    /// True when the directory's path below the root contains any fragment,
    /// compared case-insensitively with '/' separators
    fn excludes(&self, dir: &Path) -> bool {
        let relative = dir.strip_prefix(&self.root).unwrap_or(dir);
        let normalized = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
            .collect::<Vec<_>>()
            .join("/");
        if normalized.is_empty() {
            return false;
        }
        self.fragments.iter().any(|fragment| normalized.contains(fragment.as_str()))
    }
}

/// Finds the source files worth extracting under a root directory
pub struct FileDiscovery {
    config: DiscoveryConfig,
    excluded_files: RegexSet,
}

impl FileDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        // Patterns apply to the file name from its first character
        let anchored: Vec<String> = config.excluded_file_patterns.iter()
            .map(|pattern| format!("^(?:{})", pattern))
            .collect();

        Ok(Self {
            config: config.clone(),
            excluded_files: RegexSet::new(anchored)?,
        })
    }

    /// Walk `root` and return the accepted files as absolute paths in a
    /// stable order. Excluded directories are never descended into.
    pub fn discover(&self, root: &Path, progress: &dyn ProgressReporter) -> Result<Vec<PathBuf>> {
        let root = root.canonicalize().map_err(|e| {
            CodelensError::FileSystem(format!("Cannot read source root {}: {}", root.display(), e))
        })?;
        if !root.is_dir() {
            return Err(CodelensError::FileSystem(format!(
                "Source root {} is not a directory", root.display()
            )));
        }

        let exclusion = DirExclusion {
            root: root.clone(),
            fragments: self.config.excluded_dirs.iter().map(|d| d.to_lowercase()).collect(),
        };

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map_or(false, |t| t.is_dir());
                !(is_dir && entry.depth() > 0 && exclusion.excludes(entry.path()))
            });
        if self.config.respect_gitignore {
            builder.git_ignore(true).git_exclude(true);
        }

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walker error: {}", e);
                    continue;
                }
            };

            if !entry.file_type().map_or(false, |t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if !self.has_supported_extension(path) {
                continue;
            }

            if self.is_excluded_file_name(path) {
                progress.report(ProgressEvent::Skipped { path, reason: SkipReason::ExcludedPattern });
                continue;
            }

            // Unknown size counts as small enough
            if let Ok(metadata) = entry.metadata() {
                if metadata.len() > self.config.max_file_size {
                    progress.report(ProgressEvent::Skipped {
                        path,
                        reason: SkipReason::TooLarge { bytes: metadata.len() },
                    });
                    continue;
                }
            }

            files.push(path.to_path_buf());
            if self.config.progress_interval > 0 && files.len() % self.config.progress_interval == 0 {
                progress.report(ProgressEvent::Collected { collected: files.len() });
            }
        }

        info!("Found {} source files to analyze after filtering", files.len());
        Ok(files)
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.config.extensions.iter().any(|allowed| allowed == ext),
            None => false,
        }
    }

    fn is_excluded_file_name(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!("Skipping non UTF-8 file name: {}", path.display());
            return true;
        };
        self.excluded_files.is_match(name)
    }
}

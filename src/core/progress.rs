//! Progress reporting capability passed into discovery and extraction

use std::path::Path;
use tracing::{debug, info};

/// Something worth telling the user about while a run is in flight
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// Discovery has collected `collected` files so far
    Collected { collected: usize },
    /// A file was left out before parsing
    Skipped { path: &'a Path, reason: SkipReason },
    /// Extraction finished `processed` of `total` files
    Extracted { processed: usize, total: usize, path: &'a Path },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { bytes: u64 },
    ExcludedPattern,
}

/// Receives progress events. Implementations must tolerate calls from
/// several extraction workers at once.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent<'_>);
}

/// Emits progress as tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::Collected { collected } => {
                info!("Collected {} files...", collected);
            }
            ProgressEvent::Skipped { path, reason: SkipReason::TooLarge { bytes } } => {
                info!(
                    "Skipping large file ({:.1}MB): {}",
                    bytes as f64 / (1024.0 * 1024.0),
                    path.display()
                );
            }
            ProgressEvent::Skipped { path, reason: SkipReason::ExcludedPattern } => {
                debug!("Skipping excluded file: {}", path.display());
            }
            ProgressEvent::Extracted { processed, total, path } => {
                let name = path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                info!("Processing file {}/{}: {}", processed, total, name);
            }
        }
    }
}

/// Discards all progress
#[cfg(test)]
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

#[cfg(test)]
impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent<'_>) {}
}

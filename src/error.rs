use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Codelens operations
#[derive(Error, Debug)]
pub enum CodelensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    /// Reading or writing a persisted artifact failed. Fatal to the run that
    /// produces the artifact, unlike per-file extraction errors.
    #[error("Failed to write artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Traversal error: {0}")]
    Traversal(String),
}

pub type Result<T> = std::result::Result<T, CodelensError>;

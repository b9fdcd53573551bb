//! Error types for gatherlib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while gathering files.
///
/// Per-file read failures (`FileRead`) travel inside a
/// [`FileRecord`](crate::FileRecord) and never abort the pipeline. Every other
/// variant is fatal to the walk that produced it.
#[derive(Error, Debug)]
pub enum GatherError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The root `.gitignore` exists but could not be read
    #[error("loading gitignore '{path}': {source}")]
    Gitignore {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid glob pattern (gitignore line or extra ignore pattern)
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Traversal failed (unreadable directory, permission denied, ...)
    #[error("error walking directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// The gather was cancelled before the walk finished
    #[error("walk cancelled")]
    Cancelled,

    /// Path does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// Root is not a directory
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A pipeline thread could not be started
    #[error("failed to spawn pipeline thread: {0}")]
    Spawn(std::io::Error),

    /// A pipeline thread panicked
    #[error("{0} thread panicked")]
    StagePanicked(&'static str),
}

impl GatherError {
    /// True when the walk stopped because the cancellation signal fired.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatherError::Cancelled)
    }
}

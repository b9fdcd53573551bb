//! Input options for file gathering.
//!
//! `GatherOptions` is an immutable snapshot for one gather: it is cloned into
//! the walker thread and never mutated while the pipeline runs.

use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};

/// Version-control metadata directories that are always pruned.
pub const VCS_DIRS: &[&str] = &[".git", ".svn", ".hg"];

/// Configuration for which files a gather emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatherOptions {
    /// Extension allow-list, each entry dot-prefixed (empty = all files)
    pub extensions: Vec<String>,
    /// Include entries whose name starts with '.'
    pub include_hidden: bool,
    /// Skip loading the root `.gitignore`
    pub ignore_gitignore: bool,
    /// Extra shell-style globs matched against base names
    pub ignore_patterns: Vec<String>,
    /// Apply `ignore_patterns` to files only, never to directories
    pub ignore_files_only: bool,
    /// Worker count (None = host parallelism)
    pub workers: Option<usize>,
}

impl Default for GatherOptions {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            include_hidden: true,
            ignore_gitignore: false,
            ignore_patterns: Vec::new(),
            ignore_files_only: false,
            workers: None,
        }
    }
}

impl GatherOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict output to the given extensions ("go" and ".go" are equivalent).
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    /// Builder: set hidden-file inclusion
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Builder: disable `.gitignore` handling
    pub fn ignore_gitignore(mut self, ignore: bool) -> Self {
        self.ignore_gitignore = ignore;
        self
    }

    /// Add an extra ignore pattern.
    pub fn ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    /// Builder: scope extra ignore patterns to files
    pub fn ignore_files_only(mut self, files_only: bool) -> Self {
        self.ignore_files_only = files_only;
        self
    }

    /// Builder: set the worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Resolve the number of worker threads to run.
    ///
    /// Zero is treated as one. Without an explicit count this is the host's
    /// available parallelism.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            Some(n) => n.max(1),
            None => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }

    /// Check a file extension (dot-prefixed, case-sensitive) against the allow-list.
    pub fn allows_extension(&self, ext: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        // Entries deserialized from config may lack the dot.
        self.extensions
            .iter()
            .any(|wanted| match wanted.strip_prefix('.') {
                Some(_) => wanted == ext,
                None => ext.strip_prefix('.') == Some(wanted.as_str()),
            })
    }
}

/// Give an extension a leading dot if it lacks one.
pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

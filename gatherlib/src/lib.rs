//! # gatherlib
//!
//! Concurrent file gathering for prompt and context builders.
//!
//! ## Overview
//!
//! `gatherlib` walks a directory tree, applies a layered set of inclusion
//! rules and reads every surviving file on a pool of worker threads. The
//! result is one [`FileRecord`] per file, carrying either the file's content
//! or the error that prevented reading it. Rendering those records (Markdown,
//! XML, line numbers) is left to the caller.
//!
//! Filters, in the order they are applied to each entry:
//!
//! - **Hidden files**: names starting with `.` (included by default)
//! - **VCS directories**: `.git`, `.svn`, `.hg` are always pruned
//! - **`.gitignore`**: root ignore file with negation, anchoring and
//!   directory-only rules
//! - **Extra patterns**: shell globs matched against base names, optionally
//!   applied to files only
//! - **Extensions**: an exact, case-sensitive allow-list
//!
//! ## Pipeline
//!
//! A single walker thread feeds candidates to N workers over rendezvous
//! channels; worker outputs are merged into one stream. A shared
//! [`CancellationToken`] stops every stage, and each gather signals its token
//! when it ends. Record order is not deterministic; use
//! [`Gathered::sort_by_path`] when a stable order matters.
//!
//! ## Example
//!
//! ```rust
//! use gatherlib::{gather, GatherOptions};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! fs::write(dir.path().join("main.go"), "package main\n").unwrap();
//! fs::write(dir.path().join("go.mod"), "module demo\n").unwrap();
//! fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
//! fs::write(dir.path().join("debug.log"), "noise\n").unwrap();
//!
//! let options = GatherOptions::new().extensions(["go"]);
//! let gathered = gather(dir.path(), &options);
//!
//! assert!(gathered.is_complete());
//! assert_eq!(gathered.records.len(), 1);
//! assert_eq!(gathered.records[0].rel_path, "main.go");
//! assert_eq!(gathered.records[0].content(), Some("package main\n"));
//! ```

pub mod cancel;
pub mod error;
pub mod matcher;
pub mod options;
pub mod pipeline;
pub mod pool;
pub mod walker;

pub use cancel::CancellationToken;
pub use error::GatherError;
pub use matcher::{load_gitignore, IgnoreMatcher, GITIGNORE_FILE};
pub use options::{normalize_extension, GatherOptions, VCS_DIRS};
pub use pipeline::{gather, gather_with_token, GatherStream, Gathered};
pub use pool::{merge, read_candidate, spawn_workers, FileRecord};
pub use walker::{extension_of, spawn_walker, to_relative, walk, WalkCandidate};

/// Result type for gatherlib operations
pub type Result<T> = std::result::Result<T, GatherError>;

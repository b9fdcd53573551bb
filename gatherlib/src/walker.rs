//! Tree walker: the single producer stage of the pipeline.
//!
//! Walks the root depth-first and sends one [`WalkCandidate`] per regular
//! file that survives the hidden, VCS, ignore and extension filters. Siblings
//! are visited in file-name order; records still arrive in whatever order
//! the workers finish them.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use walkdir::WalkDir;

use crate::cancel::CancellationToken;
use crate::error::GatherError;
use crate::matcher::{load_gitignore, IgnoreMatcher};
use crate::options::{GatherOptions, VCS_DIRS};
use crate::Result;

/// A file waiting to be read by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkCandidate {
    /// Path on disk
    pub path: PathBuf,
    /// Path relative to the walk root, '/'-separated
    pub rel_path: String,
}

/// Make `path` relative to `root`, normalized to '/' separators.
pub fn to_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// Extension of a file name including the dot ("a.tar.gz" -> ".gz").
///
/// Everything from the last dot counts, so ".env" has extension ".env".
/// Names without a dot have no extension.
pub fn extension_of(name: &str) -> &str {
    name.rfind('.').map_or("", |i| &name[i..])
}

/// Build the matcher for one walk from the root `.gitignore` and extra patterns.
fn build_matcher(root: &Path, options: &GatherOptions) -> Result<IgnoreMatcher> {
    let lines = if options.ignore_gitignore {
        Vec::new()
    } else {
        load_gitignore(root)?
    };
    let matcher = IgnoreMatcher::compile(
        &lines,
        &options.ignore_patterns,
        options.ignore_files_only,
    )?;
    log::debug!(
        "walking {} ({} gitignore rules, {} extra patterns)",
        root.display(),
        matcher.rule_count(),
        options.ignore_patterns.len()
    );
    Ok(matcher)
}

/// Walk `root`, sending candidates to `out` until done.
///
/// Returns the number of candidates emitted. Any traversal error aborts the
/// walk. Observing cancellation while emitting, or finding the consumer
/// gone, yields [`GatherError::Cancelled`].
pub fn walk(
    root: &Path,
    options: &GatherOptions,
    token: &CancellationToken,
    out: &Sender<WalkCandidate>,
) -> Result<usize> {
    let matcher = build_matcher(root, options)?;
    let mut entries = WalkDir::new(root).sort_by_file_name().into_iter();
    let mut emitted = 0usize;

    while let Some(entry) = entries.next() {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let file_type = entry.file_type();
        let is_dir = file_type.is_dir();
        let file_name = entry.file_name().to_string_lossy();
        let name = &*file_name;

        if !options.include_hidden && name.starts_with('.') {
            if is_dir {
                entries.skip_current_dir();
            }
            continue;
        }

        if is_dir && VCS_DIRS.contains(&name) {
            entries.skip_current_dir();
            continue;
        }

        let Some(rel_path) = to_relative(entry.path(), root) else {
            continue;
        };

        if matcher.is_ignored(&rel_path, is_dir) {
            if is_dir {
                log::trace!("pruning ignored directory {rel_path}");
                entries.skip_current_dir();
            }
            continue;
        }

        // Directories are walked, never emitted; symlinks and special files are skipped.
        if !file_type.is_file() {
            continue;
        }

        if !options.allows_extension(extension_of(name)) {
            continue;
        }

        if token.is_cancelled() {
            return Err(GatherError::Cancelled);
        }
        let candidate = WalkCandidate {
            path: entry.path().to_path_buf(),
            rel_path,
        };
        select! {
            send(out, candidate) -> sent => {
                if sent.is_err() {
                    return Err(GatherError::Cancelled);
                }
            }
            recv(token.done()) -> _ => return Err(GatherError::Cancelled),
        }
        emitted += 1;
    }

    log::debug!("walk of {} emitted {emitted} candidates", root.display());
    Ok(emitted)
}

/// Run [`walk`] on its own thread.
///
/// The returned receiver closes when the walk ends; the join handle is the
/// walk's error slot and should be joined only after the stream is drained.
pub fn spawn_walker(
    root: PathBuf,
    options: GatherOptions,
    token: CancellationToken,
) -> Result<(Receiver<WalkCandidate>, JoinHandle<Result<usize>>)> {
    let (tx, rx) = crossbeam_channel::bounded(0);
    let handle = thread::Builder::new()
        .name("gather-walker".to_string())
        .spawn(move || {
            let result = walk(&root, &options, &token, &tx);
            if let Err(e) = &result {
                log::debug!("walk of {} stopped: {e}", root.display());
            }
            result
        })
        .map_err(GatherError::Spawn)?;
    Ok((rx, handle))
}

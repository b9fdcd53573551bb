//! Pipeline coordinator: walker -> worker pool -> merge -> caller.
//!
//! Every gather owns a cancellation token that is signalled when the gather
//! ends, however it ends, so no stage is left blocked on a send that nobody
//! will receive.

use std::path::Path;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;

use crate::cancel::CancellationToken;
use crate::error::GatherError;
use crate::options::GatherOptions;
use crate::pool::{merge, spawn_workers, FileRecord};
use crate::walker::spawn_walker;
use crate::Result;

/// Records collected by a gather, plus the walk error if one occurred.
///
/// Records are in no particular order. When `error` is set the records are
/// whatever was read before the walk stopped.
#[derive(Debug, Default)]
pub struct Gathered {
    pub records: Vec<FileRecord>,
    pub error: Option<GatherError>,
}

impl Gathered {
    /// True if the walk finished without a structural error.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Discard partial results on error.
    pub fn into_result(self) -> Result<Vec<FileRecord>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.records),
        }
    }

    /// Records whose content was read.
    pub fn successes(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter().filter(|r| r.is_ok())
    }

    /// Records that carry a read error.
    pub fn failures(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter().filter(|r| !r.is_ok())
    }

    /// Sort records by relative path for deterministic output.
    pub fn sort_by_path(&mut self) {
        self.records.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    }
}

/// A running gather whose merged records can be consumed incrementally.
///
/// Iterating yields records as workers finish them. Dropping the stream
/// early cancels the pipeline and joins every stage thread.
pub struct GatherStream {
    records: Receiver<FileRecord>,
    token: CancellationToken,
    walker: Option<JoinHandle<Result<usize>>>,
    workers: Vec<JoinHandle<usize>>,
    mergers: Vec<JoinHandle<()>>,
}

impl GatherStream {
    /// Start gathering `root` with a fresh cancellation token.
    pub fn start(root: impl AsRef<Path>, options: &GatherOptions) -> Result<Self> {
        Self::start_with_token(root, options, CancellationToken::new())
    }

    /// Start gathering `root`, observing a caller-supplied token.
    ///
    /// The token is signalled when the stream finishes or is dropped.
    pub fn start_with_token(
        root: impl AsRef<Path>,
        options: &GatherOptions,
        token: CancellationToken,
    ) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(GatherError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(GatherError::NotADirectory(root.to_path_buf()));
        }

        let (candidates, walker) =
            spawn_walker(root.to_path_buf(), options.clone(), token.clone())?;

        let spawned = spawn_workers(options.worker_count(), &candidates, &token);
        let (outputs, workers) = match spawned {
            Ok(spawned) => spawned,
            Err(e) => {
                token.cancel();
                drop(candidates);
                let _ = walker.join();
                return Err(e);
            }
        };
        // Workers hold the only receivers now; the walker sees a disconnect if they all exit.
        drop(candidates);

        let (records, mergers) = match merge(outputs, &token) {
            Ok(merged) => merged,
            Err(e) => {
                token.cancel();
                let _ = walker.join();
                for worker in workers {
                    let _ = worker.join();
                }
                return Err(e);
            }
        };

        Ok(Self {
            records,
            token,
            walker: Some(walker),
            workers,
            mergers,
        })
    }

    /// The token shared by every stage of this gather.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Ask every stage to stop. Records already in flight may still arrive.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Drain the remaining records, stop all stages and report the walk error.
    pub fn finish(mut self) -> Gathered {
        let records: Vec<FileRecord> = self.records.iter().collect();
        let error = self.shutdown();

        log::debug!(
            "gathered {} records ({} unreadable){}",
            records.len(),
            records.iter().filter(|r| !r.is_ok()).count(),
            if error.is_some() { ", walk failed" } else { "" }
        );
        Gathered { records, error }
    }

    /// Signal the token and join every stage. The walk error takes precedence
    /// over a panicked worker or forwarder.
    fn shutdown(&mut self) -> Option<GatherError> {
        self.token.cancel();

        let mut error = match self.walker.take().map(JoinHandle::join) {
            Some(Ok(Ok(_))) | None => None,
            Some(Ok(Err(e))) => Some(e),
            Some(Err(_)) => Some(GatherError::StagePanicked("walker")),
        };

        for worker in self.workers.drain(..) {
            if worker.join().is_err() && error.is_none() {
                error = Some(GatherError::StagePanicked("worker"));
            }
        }
        for merger in self.mergers.drain(..) {
            if merger.join().is_err() && error.is_none() {
                error = Some(GatherError::StagePanicked("merge"));
            }
        }
        error
    }
}

impl Iterator for GatherStream {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        self.records.recv().ok()
    }
}

impl Drop for GatherStream {
    fn drop(&mut self) {
        if let Some(e) = self.shutdown() {
            if !e.is_cancelled() {
                log::warn!("gather abandoned with error: {e}");
            }
        }
    }
}

/// Gather every file under `root` that passes `options`.
///
/// Runs the whole pipeline to completion and returns all records together
/// with the walk error, if any.
///
/// # Example
///
/// ```rust,ignore
/// use gatherlib::{gather, GatherOptions};
///
/// let gathered = gather(".", &GatherOptions::new().extensions(["rs"]));
/// for record in gathered.successes() {
///     println!("{}", record.rel_path);
/// }
/// if let Some(e) = gathered.error {
///     eprintln!("{e}");
/// }
/// ```
pub fn gather(root: impl AsRef<Path>, options: &GatherOptions) -> Gathered {
    gather_with_token(root, options, CancellationToken::new())
}

/// Like [`gather`], observing a caller-supplied token.
///
/// Cancelling the token from another thread stops the gather early. If the
/// walk had not finished, the returned `Gathered` carries
/// [`GatherError::Cancelled`] alongside the records read so far.
pub fn gather_with_token(
    root: impl AsRef<Path>,
    options: &GatherOptions,
    token: CancellationToken,
) -> Gathered {
    match GatherStream::start_with_token(root, options, token) {
        Ok(stream) => stream.finish(),
        Err(e) => Gathered {
            records: Vec::new(),
            error: Some(e),
        },
    }
}

//! Worker pool and fan-in merge.
//!
//! Workers compete for candidates on the walker's channel, read each file in
//! full and send exactly one [`FileRecord`] per candidate on their own output
//! channel. [`merge`] forwards every worker channel into a single stream that
//! closes once all inputs have closed.
//!
//! Cancellation is checked before every receive and send, never during a
//! read, so shutdown waits for at most one in-flight read per worker.

use std::fs;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};

use crate::cancel::CancellationToken;
use crate::error::GatherError;
use crate::walker::WalkCandidate;
use crate::Result;

/// The outcome of reading one candidate: its content or the read error.
#[derive(Debug)]
pub struct FileRecord {
    /// Path on disk
    pub path: PathBuf,
    /// Path relative to the walk root, '/'-separated
    pub rel_path: String,
    /// File content, or the `FileRead` error that prevented reading it
    pub content: Result<String>,
}

impl FileRecord {
    /// Whether the file was read successfully.
    pub fn is_ok(&self) -> bool {
        self.content.is_ok()
    }

    /// The file content, if it was read.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().ok()
    }

    /// The read error, if any.
    pub fn error(&self) -> Option<&GatherError> {
        self.content.as_ref().err()
    }
}

/// Read a candidate into a record. Never fails; errors land in the record.
pub fn read_candidate(candidate: WalkCandidate) -> FileRecord {
    let WalkCandidate { path, rel_path } = candidate;
    let content = fs::read_to_string(&path).map_err(|source| GatherError::FileRead {
        path: path.clone(),
        source,
    });
    if let Err(e) = &content {
        log::debug!("{e}");
    }
    FileRecord {
        path,
        rel_path,
        content,
    }
}

fn run_worker(
    input: Receiver<WalkCandidate>,
    out: Sender<FileRecord>,
    token: CancellationToken,
) -> usize {
    let mut processed = 0;
    loop {
        if token.is_cancelled() {
            break;
        }
        let candidate = select! {
            recv(input) -> msg => match msg {
                Ok(candidate) => candidate,
                Err(_) => break,
            },
            recv(token.done()) -> _ => break,
        };

        let record = read_candidate(candidate);

        select! {
            send(out, record) -> sent => {
                if sent.is_err() {
                    break;
                }
            }
            recv(token.done()) -> _ => break,
        }
        processed += 1;
    }
    processed
}

/// Start `count` workers (at least one) consuming `input`.
///
/// Returns one output receiver and one join handle per worker; each handle
/// yields the number of records that worker delivered.
pub fn spawn_workers(
    count: usize,
    input: &Receiver<WalkCandidate>,
    token: &CancellationToken,
) -> Result<(Vec<Receiver<FileRecord>>, Vec<JoinHandle<usize>>)> {
    let count = count.max(1);
    let mut outputs = Vec::with_capacity(count);
    let mut handles = Vec::with_capacity(count);

    for idx in 0..count {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let worker_input = input.clone();
        let worker_token = token.clone();
        let spawned = thread::Builder::new()
            .name(format!("gather-worker-{idx}"))
            .spawn(move || run_worker(worker_input, tx, worker_token));

        match spawned {
            Ok(handle) => {
                outputs.push(rx);
                handles.push(handle);
            }
            Err(e) => {
                token.cancel();
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(GatherError::Spawn(e));
            }
        }
    }

    log::debug!("started {count} workers");
    Ok((outputs, handles))
}

/// Fan several streams into one.
///
/// One forwarder thread per input; the merged receiver closes once every
/// forwarder has finished. No ordering across inputs is preserved.
pub fn merge<T: Send + 'static>(
    inputs: Vec<Receiver<T>>,
    token: &CancellationToken,
) -> Result<(Receiver<T>, Vec<JoinHandle<()>>)> {
    let (tx, rx) = crossbeam_channel::bounded(0);
    let mut handles = Vec::with_capacity(inputs.len());

    for (idx, input) in inputs.into_iter().enumerate() {
        let out = tx.clone();
        let forward_token = token.clone();
        let spawned = thread::Builder::new()
            .name(format!("gather-merge-{idx}"))
            .spawn(move || forward(input, out, forward_token));

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                token.cancel();
                drop(tx);
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(GatherError::Spawn(e));
            }
        }
    }

    Ok((rx, handles))
}

fn forward<T>(input: Receiver<T>, out: Sender<T>, token: CancellationToken) {
    loop {
        let item = select! {
            recv(input) -> msg => match msg {
                Ok(item) => item,
                Err(_) => return,
            },
            recv(token.done()) -> _ => return,
        };
        select! {
            send(out, item) -> sent => {
                if sent.is_err() {
                    return;
                }
            }
            recv(token.done()) -> _ => return,
        }
    }
}

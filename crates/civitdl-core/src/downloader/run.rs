//! Coordinator: one worker thread per chunk, results over an mpsc channel.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::error::FetchError;
use crate::progress::{ProgressSink, ProgressStats};
use crate::retry::{run_with_resume, ChunkError, RetryPolicy};
use crate::storage::StorageWriter;

use super::chunk;
use super::{CurlOptions, DownloadSession};

/// What a worker sends back when its chunk is done or given up.
struct ChunkOutcome {
    index: usize,
    attempts: u32,
    result: Result<(), ChunkError>,
}

/// Downloads every chunk of `session` concurrently. The first chunk that
/// exhausts its retries (or hits a fatal error) raises the abort flag, which
/// stops the other workers promptly; all workers are joined before
/// returning. A chunk's budget starts over whenever an attempt wrote bytes.
/// Each chunk's `attempts` is updated as its worker reports back. Returns
/// the total number of failed attempts.
pub(super) fn run_chunks(
    session: &mut DownloadSession,
    storage: &StorageWriter,
    policy: &RetryPolicy,
    curl: CurlOptions,
    progress: &mut dyn ProgressSink,
    tick: Duration,
) -> Result<u32, FetchError> {
    let started = Instant::now();
    let chunk_count = session.chunks.len();
    let total_size = session.total_size;
    let bytes_done = Arc::new(AtomicU64::new(0));
    let abort = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<ChunkOutcome>();

    let mut handles = Vec::with_capacity(chunk_count);
    for chunk in session.chunks.iter().copied() {
        let tx = tx.clone();
        let url = session.url.clone();
        let storage = storage.clone();
        let bytes_done = Arc::clone(&bytes_done);
        let abort = Arc::clone(&abort);
        let policy = *policy;
        handles.push(std::thread::spawn(move || {
            let mut written = 0u64;
            let mut attempts = 0u32;
            let moved = Cell::new(false);
            let result = run_with_resume(&policy, Some(abort.as_ref()), || moved.take(), |attempt| {
                attempts += 1;
                if attempts > 1 {
                    tracing::debug!(
                        chunk = chunk.index,
                        attempt,
                        range = %chunk.range_header_value(written),
                        "resuming chunk"
                    );
                }
                let before = written;
                let r = chunk::fetch_range(&url, &chunk, &mut written, &storage, &bytes_done, &abort, curl);
                moved.set(written > before);
                r
            });
            let _ = tx.send(ChunkOutcome {
                index: chunk.index,
                attempts,
                result,
            });
        }));
    }
    drop(tx);

    let snapshot = |chunks_done: usize| ProgressStats {
        bytes_done: bytes_done.load(Ordering::Relaxed),
        total_bytes: total_size,
        elapsed_secs: started.elapsed().as_secs_f64(),
        chunks_done,
        chunk_count,
    };

    let mut first_error: Option<FetchError> = None;
    let mut chunks_done = 0usize;
    let mut retries = 0u32;
    let mut to_receive = chunk_count;
    while to_receive > 0 {
        let outcome = match rx.recv_timeout(tick) {
            Ok(o) => o,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                progress.on_progress(&snapshot(chunks_done));
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                if first_error.is_none() {
                    first_error = Some(FetchError::Other(anyhow::anyhow!(
                        "chunk result channel closed (worker may have panicked)"
                    )));
                }
                break;
            }
        };
        to_receive -= 1;
        retries += outcome.attempts.saturating_sub(1);
        if let Some(c) = session.chunks.get_mut(outcome.index) {
            c.attempts = outcome.attempts;
        }
        match outcome.result {
            Ok(()) => {
                chunks_done += 1;
                tracing::debug!(chunk = outcome.index, attempts = outcome.attempts, "chunk complete");
            }
            Err(e) if abort.load(Ordering::Relaxed) => {
                tracing::debug!(chunk = outcome.index, "chunk stopped after cancel: {}", e);
            }
            Err(e) => {
                tracing::warn!(chunk = outcome.index, attempts = outcome.attempts, "chunk failed: {}", e);
                abort.store(true, Ordering::Relaxed);
                if first_error.is_none() {
                    first_error = Some(FetchError::IncompleteDownload {
                        chunk: outcome.index,
                        attempts: outcome.attempts,
                        source: e,
                    });
                }
            }
        }
    }

    for h in handles {
        if h.join().is_err() && first_error.is_none() {
            first_error = Some(FetchError::Other(anyhow::anyhow!("chunk worker panicked")));
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            progress.on_progress(&snapshot(chunks_done));
            Ok(retries)
        }
    }
}

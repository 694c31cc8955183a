//! Chunked parallel downloader.
//!
//! Splits a URL into N byte ranges, preallocates a `.part` staging file,
//! runs one worker thread per chunk issuing HTTP Range GETs, retries each
//! chunk from where it stopped, and renames the staging file onto the target
//! once every chunk has landed.

mod chunk;
mod run;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::FetchError;
use crate::progress::{ProgressSink, ProgressStats};
use crate::retry::RetryPolicy;
use crate::segmenter::{plan_chunks, Chunk};
use crate::storage::{self, StorageWriterBuilder};

/// Upper bound on concurrent chunk workers.
pub const MAX_CHUNKS: usize = 16;

const PROGRESS_TICK: Duration = Duration::from_millis(250);

/// Per-request curl settings shared by probes and chunk workers.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort a transfer that stays below 1 KiB/s for this long.
    pub low_speed_time: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_time: Duration::from_secs(60),
        }
    }
}

/// One download in flight. Lives only for the duration of `ChunkedDownloader::run`.
#[derive(Debug, Clone)]
pub struct DownloadSession {
    pub url: String,
    pub total_size: u64,
    pub chunks: Vec<Chunk>,
    pub target_path: PathBuf,
}

/// What a finished download looked like.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub chunk_count: usize,
    /// Failed attempts summed over all chunks.
    pub retries: u32,
    pub elapsed: Duration,
    /// The chunk plan with each chunk's attempt count filled in.
    pub chunks: Vec<Chunk>,
}

/// Downloads a URL into a file with `chunk_count` concurrent ranged GETs.
#[derive(Debug, Clone)]
pub struct ChunkedDownloader {
    chunk_count: usize,
    policy: RetryPolicy,
    curl: CurlOptions,
}

impl ChunkedDownloader {
    /// `chunk_count` is clamped to 1..=16. `policy.max_retries()` is the
    /// per-chunk retry budget.
    pub fn new(chunk_count: usize, policy: RetryPolicy) -> Self {
        Self {
            chunk_count: chunk_count.clamp(1, MAX_CHUNKS),
            policy,
            curl: CurlOptions::default(),
        }
    }

    pub fn with_curl_options(mut self, curl: CurlOptions) -> Self {
        self.curl = curl;
        self
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn max_retries_per_chunk(&self) -> u32 {
        self.policy.max_retries()
    }

    pub fn curl_options(&self) -> CurlOptions {
        self.curl
    }

    /// Plans the chunk layout without touching the network or disk.
    pub fn plan(&self, url: &str, total_size: u64, target_path: &Path) -> DownloadSession {
        DownloadSession {
            url: url.to_string(),
            total_size,
            chunks: plan_chunks(total_size, self.chunk_count),
            target_path: target_path.to_path_buf(),
        }
    }

    /// Downloads `url` (`total_size` bytes) to `target_path`.
    ///
    /// On `IncompleteDownload` the `.part` staging file is left in place and
    /// the target path is untouched.
    pub fn run(
        &self,
        url: &str,
        total_size: u64,
        target_path: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<DownloadReport, FetchError> {
        let started = Instant::now();
        let mut session = self.plan(url, total_size, target_path);
        let temp = storage::temp_path(target_path);

        let mut builder = StorageWriterBuilder::create(&temp)?;
        builder.preallocate(total_size)?;
        let writer = builder.build();

        tracing::debug!(
            url,
            total_size,
            chunks = session.chunks.len(),
            temp = %temp.display(),
            "starting chunked download"
        );

        let retries = if session.chunks.is_empty() {
            0
        } else {
            run::run_chunks(&mut session, &writer, &self.policy, self.curl, progress, PROGRESS_TICK)?
        };

        writer.sync()?;
        writer.finalize(target_path)?;

        let elapsed = started.elapsed();
        progress.on_progress(&ProgressStats {
            bytes_done: total_size,
            total_bytes: total_size,
            elapsed_secs: elapsed.as_secs_f64(),
            chunks_done: session.chunks.len(),
            chunk_count: session.chunks.len(),
        });
        tracing::info!(
            path = %target_path.display(),
            bytes = total_size,
            retries,
            elapsed_ms = elapsed.as_millis() as u64,
            "download complete"
        );

        Ok(DownloadReport {
            path: target_path.to_path_buf(),
            bytes: total_size,
            chunk_count: session.chunks.len(),
            retries,
            elapsed,
            chunks: session.chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_is_clamped() {
        assert_eq!(ChunkedDownloader::new(0, RetryPolicy::default()).chunk_count(), 1);
        assert_eq!(ChunkedDownloader::new(64, RetryPolicy::default()).chunk_count(), 16);
        assert_eq!(ChunkedDownloader::new(4, RetryPolicy::default()).chunk_count(), 4);
    }

    #[test]
    fn retry_budget_comes_from_policy() {
        let d = ChunkedDownloader::new(4, RetryPolicy::default().with_max_retries(30));
        assert_eq!(d.max_retries_per_chunk(), 30);
    }

    #[test]
    fn plan_covers_file() {
        let d = ChunkedDownloader::new(4, RetryPolicy::default());
        let s = d.plan("http://h/f", 4000, Path::new("/tmp/foo.safetensors"));
        let ranges: Vec<(u64, u64)> = s.chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(ranges, vec![(0, 999), (1000, 1999), (2000, 2999), (3000, 3999)]);
        assert_eq!(s.total_size, 4000);
    }

    #[test]
    fn zero_byte_download_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("empty.bin");
        let d = ChunkedDownloader::new(4, RetryPolicy::default());
        let report = d
            .run("http://127.0.0.1:9/unused", 0, &target, &mut crate::progress::NoProgress)
            .unwrap();
        assert_eq!(report.bytes, 0);
        assert_eq!(report.chunk_count, 0);
        assert_eq!(std::fs::metadata(&target).unwrap().len(), 0);
        assert!(!storage::temp_path(&target).exists());
    }
}

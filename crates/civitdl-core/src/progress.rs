//! Progress reporting for downloads (bytes done, ETA, rate).
//!
//! The downloader's coordinator emits a `ProgressStats` snapshot on a fixed
//! tick and once at the end. Hosts receive it through a `ProgressSink`:
//! a closure, a tokio channel, or `NoProgress`.

/// Snapshot of download progress (cumulative).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Bytes written to disk so far, across all chunks.
    pub bytes_done: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Elapsed time since the download started (seconds).
    pub elapsed_secs: f64,
    /// Chunks fully written.
    pub chunks_done: usize,
    /// Chunks in the plan.
    pub chunk_count: usize,
}

impl ProgressStats {
    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if the rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Receiver of progress snapshots supplied by the host application.
pub trait ProgressSink {
    fn on_progress(&mut self, stats: &ProgressStats);
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _stats: &ProgressStats) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressStats),
{
    fn on_progress(&mut self, stats: &ProgressStats) {
        self(stats)
    }
}

/// Non-blocking: a full channel drops the update, the next tick catches up.
impl ProgressSink for tokio::sync::mpsc::Sender<ProgressStats> {
    fn on_progress(&mut self, stats: &ProgressStats) {
        let _ = self.try_send(stats.clone());
    }
}

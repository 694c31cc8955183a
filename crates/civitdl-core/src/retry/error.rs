//! Per-attempt chunk download error, classified before it becomes fatal.

/// Error returned by a single ranged GET for one chunk.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// Curl reported a transport failure (timeout, reset, body cut short).
    #[error("connection lost: {0}")]
    ConnectionLost(#[source] curl::Error),
    /// The server did not answer with 206 Partial Content.
    #[error("expected HTTP 206, got HTTP {0}")]
    Http(u32),
    /// Transfer completed but fewer bytes arrived than the range asked for.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Disk write failed (disk full, permission denied). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// Another chunk failed and the download was cancelled.
    #[error("cancelled")]
    Aborted,
}

//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures, missing
//! partial content) and exponential backoff decisions, shared by the catalog
//! client and the chunked downloader.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify_chunk_status, classify_curl_error, classify_http_status, Retryable};
pub use error::ChunkError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_resume, run_with_retry};

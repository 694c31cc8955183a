//! civitdl core: resolve catalog model references, download them in parallel
//! byte-range chunks, verify SHA-256 and keep a local cache index.

pub mod air;
pub mod cache;
pub mod catalog;
pub mod checksum;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetch_head;
pub mod logging;
pub mod lookup;
pub mod naming;
pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod segmenter;
pub mod storage;

pub use air::AirTag;
pub use cache::{CacheStore, FileDescriptor, SearchPaths};
pub use catalog::{CatalogClient, Resolution};
pub use downloader::ChunkedDownloader;
pub use error::FetchError;
pub use lookup::Provenance;
pub use orchestrator::{FetchOutcome, FetchState, Orchestrator};
pub use progress::{NoProgress, ProgressSink, ProgressStats};

//! Top-level fetch flow: resolve, check disk, download, verify, record.

mod state;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::air::AirTag;
use crate::cache::{CacheStore, FileDescriptor};
use crate::catalog::{CatalogClient, CurlTransport, Resolution, ResolutionSource};
use crate::checksum::{digests_match, sha256_path};
use crate::config::CivitdlConfig;
use crate::downloader::{ChunkedDownloader, DownloadReport};
use crate::error::FetchError;
use crate::fetch_head::determine_total_size;
use crate::naming::{derive_file_name, local_file_name};
use crate::progress::ProgressSink;

pub use state::{FetchState, StateTrail};

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Local path of the verified file.
    pub path: PathBuf,
    pub resolution: Resolution,
    /// `None` when the file was already on disk.
    pub download: Option<DownloadReport>,
    /// Digest of the file, when it was computed.
    pub sha256: Option<String>,
    pub trail: StateTrail,
}

impl FetchOutcome {
    pub fn air(&self) -> AirTag {
        AirTag::new(self.resolution.model_id, Some(self.resolution.version_id))
    }

    pub fn downloaded(&self) -> bool {
        self.download.is_some()
    }
}

/// Drives one model reference to a verified local file.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    catalog: CatalogClient,
    downloader: ChunkedDownloader,
    save_dir: PathBuf,
    allowed_types: Vec<String>,
}

/// Outcome of checking a file already at the target path.
enum DiskCheck {
    Verified(Option<String>),
    Mismatch,
    Missing,
}

impl Orchestrator {
    pub fn new(catalog: CatalogClient, downloader: ChunkedDownloader, save_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            downloader,
            save_dir: save_dir.into(),
            allowed_types: Vec::new(),
        }
    }

    /// Wires every component from the user configuration.
    pub fn from_config(cfg: &CivitdlConfig) -> Result<Self> {
        let cache = CacheStore::open(cfg.cache_path.as_deref())?;
        let catalog = CatalogClient::new(&cfg.api_base, cache, cfg.search_paths(), cfg.catalog_retry_policy())
            .with_transport(Arc::new(CurlTransport::new(cfg.curl_options())))
            .with_debug_response(cfg.debug_response);
        let downloader = ChunkedDownloader::new(cfg.chunk_count(), cfg.chunk_retry_policy())
            .with_curl_options(cfg.curl_options());
        Ok(Self::new(catalog, downloader, cfg.save_dir.clone()).with_allowed_types(cfg.allowed_types.clone()))
    }

    /// Model types accepted by `fetch`; empty accepts every type.
    pub fn with_allowed_types(mut self, allowed_types: Vec<String>) -> Self {
        self.allowed_types = allowed_types;
        self
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn downloader(&self) -> &ChunkedDownloader {
        &self.downloader
    }

    /// Resolves `tag`, downloads the file unless a verified copy is already on
    /// disk, verifies it and records it in the cache.
    pub fn fetch(&self, tag: AirTag, progress: &mut dyn ProgressSink) -> Result<FetchOutcome, FetchError> {
        let mut trail = StateTrail::default();
        match self.run(tag, progress, &mut trail) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let stage = trail.current();
                trail.enter(FetchState::Failed);
                tracing::warn!(%tag, stage = ?stage, "fetch failed: {}", e);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        tag: AirTag,
        progress: &mut dyn ProgressSink,
        trail: &mut StateTrail,
    ) -> Result<FetchOutcome, FetchError> {
        trail.enter(FetchState::ResolvingMetadata);
        let mut resolution = self
            .catalog
            .resolve(tag.model_id, tag.version_id, &self.allowed_types)?;
        let name = resolution.descriptor.name.trim();
        resolution.descriptor.name = if name.is_empty() {
            String::new()
        } else {
            local_file_name(name)
        };

        trail.enter(FetchState::CheckingDisk);
        let existing = self.existing_target(&resolution);
        if let Some(path) = &existing {
            match check_on_disk(path, &resolution.descriptor)? {
                DiskCheck::Verified(sha256) => {
                    trail.enter(FetchState::Cached);
                    self.record(&resolution)?;
                    trail.enter(FetchState::Done);
                    tracing::info!(%tag, path = %path.display(), "already on disk");
                    return Ok(FetchOutcome {
                        path: path.clone(),
                        resolution,
                        download: None,
                        sha256,
                        trail: trail.clone(),
                    });
                }
                DiskCheck::Mismatch => {
                    tracing::warn!(path = %path.display(), "existing file does not match its SHA256, downloading again");
                    trail.enter(FetchState::Retrying);
                }
                DiskCheck::Missing => {}
            }
        }

        trail.enter(FetchState::Downloading);
        let url = resolution.descriptor.download_url.clone();
        let known_size = Some(resolution.descriptor.size_bytes).filter(|n| *n > 0);
        let size = determine_total_size(&url, known_size, self.downloader.curl_options())?;
        if resolution.descriptor.name.is_empty() {
            resolution.descriptor.name = derive_file_name(&url, size.content_disposition.as_deref());
        }
        let target = existing.unwrap_or_else(|| self.save_dir.join(&resolution.descriptor.name));
        let report = self.downloader.run(&url, size.total_size, &target, progress)?;

        trail.enter(FetchState::Verifying);
        let sha256 = verify(&target, &resolution.descriptor)?;

        self.record(&resolution)?;
        trail.enter(FetchState::Done);
        Ok(FetchOutcome {
            path: target,
            resolution,
            download: Some(report),
            sha256,
            trail: trail.clone(),
        })
    }

    /// Where the resolved file would already be: the cached path, or the
    /// first search path holding a file of that name.
    fn existing_target(&self, resolution: &Resolution) -> Option<PathBuf> {
        match &resolution.source {
            ResolutionSource::Cache { path } => Some(path.clone()),
            ResolutionSource::Catalog => {
                self
                    .catalog
                    .search_paths()
                    .find(&resolution.descriptor.name, resolution.descriptor.size_bytes)
            }
        }
    }

    fn record(&self, resolution: &Resolution) -> Result<(), FetchError> {
        self.catalog
            .cache()
            .record(resolution.model_id, resolution.version_id, &resolution.descriptor)?;
        Ok(())
    }
}

fn check_on_disk(path: &Path, descriptor: &FileDescriptor) -> Result<DiskCheck, FetchError> {
    if !path.is_file() {
        return Ok(DiskCheck::Missing);
    }
    let Some(expected) = descriptor.sha256.as_deref() else {
        tracing::warn!(path = %path.display(), "no SHA256 published, skipping verification");
        return Ok(DiskCheck::Verified(None));
    };
    let actual = sha256_path(path)?;
    if digests_match(expected, &actual) {
        Ok(DiskCheck::Verified(Some(actual)))
    } else {
        Ok(DiskCheck::Mismatch)
    }
}

/// Hashes a fresh download. On mismatch the file is deleted.
fn verify(path: &Path, descriptor: &FileDescriptor) -> Result<Option<String>, FetchError> {
    let Some(expected) = descriptor.sha256.as_deref() else {
        tracing::warn!(path = %path.display(), "no SHA256 published, skipping verification");
        return Ok(None);
    };
    let actual = sha256_path(path)?;
    if digests_match(expected, &actual) {
        tracing::info!(path = %path.display(), sha256 = %actual, "SHA256 verified");
        return Ok(Some(actual));
    }
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), "could not remove mismatched file: {}", e);
    }
    Err(FetchError::HashMismatch {
        path: path.to_path_buf(),
        expected: expected.to_ascii_uppercase(),
        actual,
    })
}

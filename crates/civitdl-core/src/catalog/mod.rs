//! Catalog client: resolves `modelId[@versionId]` to a file descriptor.
//!
//! The local cache is consulted first; a cached file that is present in a
//! search path resolves without any network call. Otherwise the model is
//! fetched from `{api}/models/{id}`, its type checked against the allow-list,
//! a version chosen (explicit, or the greatest id) and the file whose download
//! URL equals the version's download URL selected.

mod api;
mod http;
mod select;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CacheStore, FileDescriptor, SearchPaths};
use crate::error::FetchError;
use crate::retry::{run_with_retry, RetryPolicy};

pub use api::{ApiFile, ApiVersion, ByHashResponse, ModelResponse, ModelSummary};
pub use http::{CurlTransport, HttpResponse, Transport};
pub use select::{select_file, select_version, type_allowed};

/// Where a resolution came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionSource {
    /// Cache entry whose file is on disk at `path`.
    Cache { path: PathBuf },
    Catalog,
}

/// A model reference resolved to one concrete file.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub model_id: u64,
    pub version_id: u64,
    pub descriptor: FileDescriptor,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.source, ResolutionSource::Cache { .. })
    }
}

/// Resolves model references against the local cache and the remote catalog.
#[derive(Clone)]
pub struct CatalogClient {
    api_base: String,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    cache: CacheStore,
    search: SearchPaths,
    debug_response: bool,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api_base", &self.api_base)
            .field("cache", &self.cache.path())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(api_base: &str, cache: CacheStore, search: SearchPaths, policy: RetryPolicy) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            transport: Arc::new(CurlTransport::default()),
            policy,
            cache,
            search,
            debug_response: false,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_debug_response(mut self, on: bool) -> Self {
        self.debug_response = on;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search
    }

    pub fn model_url(&self, model_id: u64) -> String {
        format!("{}/models/{}", self.api_base, model_id)
    }

    pub fn by_hash_url(&self, digest: &str) -> String {
        format!("{}/model-versions/by-hash/{}", self.api_base, digest)
    }

    /// Resolves `model_id` (and `version_id`, if given) to a file descriptor.
    ///
    /// A cached file present on disk resolves without a network call. When
    /// the cache lists the requested version but none of its files is on
    /// disk, the catalog must still produce that version; if it cannot, the
    /// cache entry is stale and the resolution fails with `StaleCache`.
    pub fn resolve(
        &self,
        model_id: u64,
        version_id: Option<u64>,
        allowed_types: &[String],
    ) -> Result<Resolution, FetchError> {
        if let Some(hit) = self.cache.cached_file(model_id, version_id, &self.search) {
            if let Some(descriptor) = self.cache.cached_descriptor(model_id, hit.version_id, &hit.name) {
                tracing::debug!(model_id, version_id = hit.version_id, path = %hit.path.display(), "resolved from cache");
                return Ok(Resolution {
                    model_id,
                    version_id: hit.version_id,
                    descriptor,
                    source: ResolutionSource::Cache { path: hit.path },
                });
            }
            return self.corroborate(model_id, hit.version_id, &hit.name, allowed_types);
        }
        if let Some(v) = version_id {
            let listed = self.cache.cached_version(model_id, v);
            if let Some(name) = listed.and_then(|r| r.files.into_iter().next()).map(|f| f.name) {
                tracing::debug!(model_id, version_id = v, name = %name, "cached version not on disk, asking catalog");
                return self.corroborate(model_id, v, &name, allowed_types);
            }
        }
        self.resolve_remote(model_id, version_id, allowed_types)
    }

    /// The cache vouches for `model_id@version_id` but cannot serve it from
    /// disk; only the catalog can confirm the version still exists.
    fn corroborate(
        &self,
        model_id: u64,
        version_id: u64,
        name: &str,
        allowed_types: &[String],
    ) -> Result<Resolution, FetchError> {
        let stale = |reason: String| FetchError::StaleCache {
            model_id,
            version_id,
            name: name.to_string(),
            reason,
        };
        match self.resolve_remote(model_id, Some(version_id), allowed_types) {
            Ok(r) => Ok(r),
            Err(e @ FetchError::InvalidModelType { .. }) => Err(e),
            Err(e) => Err(stale(e.to_string())),
        }
    }

    fn resolve_remote(
        &self,
        model_id: u64,
        version_id: Option<u64>,
        allowed_types: &[String],
    ) -> Result<Resolution, FetchError> {
        let model = self.fetch_model(model_id)?;
        if !type_allowed(&model.model_type, allowed_types) {
            return Err(FetchError::InvalidModelType {
                found: model.model_type,
                allowed: allowed_types.to_vec(),
            });
        }
        let no_file = || FetchError::NoDownloadableFile {
            model_id,
            version_id,
        };
        let version = select_version(&model.model_versions, version_id).ok_or_else(no_file)?;
        let file = select_file(version).ok_or_else(no_file)?;
        let descriptor = file.to_descriptor(&model.model_type, &version.trained_words);
        tracing::debug!(model_id, version_id = version.id, name = %descriptor.name, "resolved from catalog");
        Ok(Resolution {
            model_id,
            version_id: version.id,
            descriptor,
            source: ResolutionSource::Catalog,
        })
    }

    /// `GET {api}/models/{id}`.
    pub fn fetch_model(&self, model_id: u64) -> Result<ModelResponse, FetchError> {
        let url = self.model_url(model_id);
        let resp = self.get(&url)?;
        if !resp.is_success() {
            return Err(FetchError::RemoteUnavailable {
                url,
                status: resp.status,
            });
        }
        self.parse(&url, &resp.body)
    }

    /// `GET {api}/model-versions/by-hash/{digest}`. A miss, a non-2xx answer
    /// or an unreachable catalog is `Ok(None)`; on a hit the entry is written
    /// back into the cache.
    pub fn by_hash(&self, digest: &str) -> Result<Option<(u64, u64, FileDescriptor)>, FetchError> {
        let url = self.by_hash_url(digest);
        let resp = match self.get(&url) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url, "hash lookup failed: {}", e);
                return Ok(None);
            }
        };
        if !resp.is_success() {
            tracing::debug!(url, status = resp.status, "hash not known to catalog");
            return Ok(None);
        }
        let found: ByHashResponse = self.parse(&url, &resp.body)?;
        let Some(file) = found.matching_file(digest) else {
            tracing::warn!(
                url,
                model_id = found.model_id,
                version_id = found.id,
                "catalog answered but no file carries this SHA256"
            );
            return Ok(None);
        };
        let descriptor = file.to_descriptor(&found.model.model_type, &found.trained_words);
        self.cache.record(found.model_id, found.id, &descriptor)?;
        Ok(Some((found.model_id, found.id, descriptor)))
    }

    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let resp = run_with_retry(&self.policy, None, |_| self.transport.get(url)).map_err(|source| {
            FetchError::RemoteUnreachable {
                url: url.to_string(),
                source,
            }
        })?;
        tracing::debug!(url, status = resp.status, bytes = resp.body.len(), "catalog response");
        if self.debug_response {
            tracing::debug!(url, body = %String::from_utf8_lossy(&resp.body), "catalog response body");
        }
        Ok(resp)
    }

    fn parse<T: serde::de::DeserializeOwned>(&self, url: &str, body: &[u8]) -> Result<T, FetchError> {
        serde_json::from_slice(body).map_err(|source| FetchError::InvalidResponse {
            url: url.to_string(),
            source,
        })
    }
}

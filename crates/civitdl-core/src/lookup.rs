//! Hash lookup: where did a file on disk come from?

use std::path::Path;

use crate::air::AirTag;
use crate::cache::FileDescriptor;
use crate::catalog::CatalogClient;
use crate::checksum::{canonical_digest, sha256_path};
use crate::error::FetchError;

/// Which source identified the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvenanceSource {
    Cache,
    Catalog,
}

/// Identity of a local file in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub model_id: u64,
    pub version_id: u64,
    pub descriptor: FileDescriptor,
    pub sha256: String,
    pub source: ProvenanceSource,
}

impl Provenance {
    pub fn air(&self) -> AirTag {
        AirTag::new(self.model_id, Some(self.version_id))
    }
}

/// Looks a digest up in the cache, then in the catalog. `Ok(None)` means
/// neither source knows it.
pub fn lookup_digest(catalog: &CatalogClient, digest: &str) -> Result<Option<Provenance>, FetchError> {
    let sha256 = canonical_digest(digest);
    if let Some(hit) = catalog.cache().find_by_hash(&sha256) {
        tracing::debug!(model_id = hit.model_id, version_id = hit.version_id, "digest found in cache");
        return Ok(Some(Provenance {
            model_id: hit.model_id,
            version_id: hit.version_id,
            descriptor: hit.descriptor,
            sha256,
            source: ProvenanceSource::Cache,
        }));
    }
    Ok(catalog
        .by_hash(&sha256)?
        .map(|(model_id, version_id, descriptor)| Provenance {
            model_id,
            version_id,
            descriptor,
            sha256,
            source: ProvenanceSource::Catalog,
        }))
}

/// Hashes `path` and looks the digest up.
pub fn identify(catalog: &CatalogClient, path: &Path) -> Result<Option<Provenance>, FetchError> {
    let digest = sha256_path(path)?;
    tracing::debug!(path = %path.display(), sha256 = %digest, "identifying file");
    lookup_digest(catalog, &digest)
}

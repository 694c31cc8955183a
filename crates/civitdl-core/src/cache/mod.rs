//! Persistent cache index: model id -> versions -> file descriptors.
//!
//! The index is one pretty-printed JSON document. Every read loads it fresh
//! from disk; every mutation takes an exclusive lock, reloads, applies the
//! change and rewrites the whole document through a temp file and rename.
//! A missing or unreadable document reads as empty; an unreadable one is
//! moved aside to `<name>.corrupt` before a mutation replaces it.

mod lock;
mod search;
mod types;

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub use search::SearchPaths;
pub use types::{kb_to_bytes, CacheHit, CacheIndex, FileDescriptor, VersionRecord};

const CORRUPT_SUFFIX: &str = ".corrupt";

/// A cached file found on disk for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFile {
    pub version_id: u64,
    pub name: String,
    pub path: PathBuf,
}

/// Handle to the cache document at a fixed path.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_DATA_HOME/civitdl/cache.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("civitdl")?;
        Ok(xdg_dirs.place_data_file("cache.json")?)
    }

    /// Store at `override_path`, or at the default location.
    pub fn open(override_path: Option<&Path>) -> Result<Self> {
        match override_path {
            Some(p) => Ok(Self::at(p)),
            None => Ok(Self::at(Self::default_path()?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current index. Missing or unreadable documents read as empty.
    pub fn load(&self) -> CacheIndex {
        match self.read_strict() {
            Ok(Some(idx)) => idx,
            Ok(None) => CacheIndex::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable cache: {:#}", e);
                CacheIndex::default()
            }
        }
    }

    /// Appends `descriptor` under `model_id@version_id` unless an entry with
    /// the same download URL is already there. Returns true if the document
    /// was rewritten.
    pub fn record(&self, model_id: u64, version_id: u64, descriptor: &FileDescriptor) -> Result<bool> {
        let _lock = lock::acquire(&self.path)?;
        let mut idx = match self.read_strict() {
            Ok(Some(idx)) => idx,
            Ok(None) => CacheIndex::default(),
            Err(e) => {
                let aside = self.move_aside()?;
                tracing::warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    "cache unreadable, starting a new one: {:#}",
                    e
                );
                CacheIndex::default()
            }
        };
        if !idx.record(model_id, version_id, descriptor) {
            tracing::debug!(model_id, version_id, name = %descriptor.name, "cache already has entry");
            return Ok(false);
        }
        self.write_atomic(&idx)?;
        tracing::info!(model_id, version_id, name = %descriptor.name, "cache entry recorded");
        Ok(true)
    }

    /// Reverse lookup by SHA-256 (any case).
    pub fn find_by_hash(&self, digest: &str) -> Option<CacheHit> {
        self.load().find_by_hash(digest)
    }

    /// Name of a cached file for `model_id` that exists in `search`.
    ///
    /// With `version_id`, only that version's files are considered; without
    /// it, the first file of any version that is present on disk wins.
    pub fn cached_file(
        &self,
        model_id: u64,
        version_id: Option<u64>,
        search: &SearchPaths,
    ) -> Option<CachedFile> {
        let idx = self.load();
        idx.versions(model_id)
            .iter()
            .filter(|v| version_id.map_or(true, |want| v.id == want))
            .flat_map(|v| v.files.iter().map(move |f| (v.id, f)))
            .find_map(|(vid, f)| {
                search.find(&f.name, f.size_bytes).map(|path| CachedFile {
                    version_id: vid,
                    name: f.name.clone(),
                    path,
                })
            })
    }

    /// The version record for `model_id@version_id`, if the cache lists one.
    pub fn cached_version(&self, model_id: u64, version_id: u64) -> Option<VersionRecord> {
        self.load().version(model_id, version_id).cloned()
    }

    /// Full descriptor for a file previously returned by `cached_file`,
    /// re-read from disk.
    pub fn cached_descriptor(&self, model_id: u64, version_id: u64, name: &str) -> Option<FileDescriptor> {
        self.load().descriptor(model_id, version_id, name).cloned()
    }

    fn read_strict(&self) -> Result<Option<CacheIndex>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        if data.trim().is_empty() {
            return Ok(None);
        }
        let idx = serde_json::from_str(&data)
            .with_context(|| format!("parse {}", self.path.display()))?;
        Ok(Some(idx))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut o = self.path.as_os_str().to_owned();
        o.push(suffix);
        PathBuf::from(o)
    }

    fn move_aside(&self) -> Result<PathBuf> {
        let aside = self.sibling(CORRUPT_SUFFIX);
        fs::rename(&self.path, &aside).with_context(|| {
            format!("move {} to {}", self.path.display(), aside.display())
        })?;
        Ok(aside)
    }

    fn write_atomic(&self, idx: &CacheIndex) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(idx).context("serialize cache")?;
        let tmp = self.sibling(&format!(".tmp.{}", std::process::id()));
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| {
            format!("rename {} to {}", tmp.display(), self.path.display())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, url: &str, sha: &str) -> FileDescriptor {
        FileDescriptor {
            id: 9,
            name: name.to_string(),
            download_url: url.to_string(),
            size_bytes: 3,
            sha256: Some(sha.to_string()),
            model_type: "LORA".to_string(),
            trained_words: Vec::new(),
        }
    }

    #[test]
    fn missing_document_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::at(dir.path().join("cache.json"));
        assert!(store.load().is_empty());
        assert!(store.find_by_hash("AA").is_none());
    }

    #[test]
    fn record_persists_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::at(dir.path().join("nested").join("cache.json"));
        let d = descriptor("foo.safetensors", "http://h/2002", "AA");
        assert!(store.record(1001, 2002, &d).unwrap());
        let first = fs::read_to_string(store.path()).unwrap();
        assert!(!store.record(1001, 2002, &d).unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), first);
        assert_eq!(store.load().versions(1001)[0].files, vec![d]);
        assert!(lock::lock_path(store.path()).exists());
    }

    #[test]
    fn corrupt_document_reads_empty_and_is_moved_aside_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();
        let store = CacheStore::at(&path);
        assert!(store.load().is_empty());

        store
            .record(1, 2, &descriptor("a.pt", "http://h/a", "BB"))
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("cache.json.corrupt")).unwrap(),
            "{ not json"
        );
        assert_eq!(store.load().versions(1).len(), 1);
    }

    #[test]
    fn cached_file_respects_version_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        fs::create_dir_all(&models).unwrap();
        let store = CacheStore::at(dir.path().join("cache.json"));
        store.record(1, 10, &descriptor("v10.pt", "http://h/10", "AA")).unwrap();
        store.record(1, 11, &descriptor("v11.pt", "http://h/11", "BB")).unwrap();
        let search = SearchPaths::new(vec![models.clone()]);

        assert!(store.cached_file(1, None, &search).is_none());

        fs::write(models.join("v11.pt"), b"abc").unwrap();
        let any = store.cached_file(1, None, &search).unwrap();
        assert_eq!((any.version_id, any.name.as_str()), (11, "v11.pt"));
        assert!(store.cached_file(1, Some(10), &search).is_none());
        assert_eq!(store.cached_file(1, Some(11), &search).unwrap().path, models.join("v11.pt"));

        let d = store.cached_descriptor(1, 11, "v11.pt").unwrap();
        assert_eq!(d.sha256.as_deref(), Some("BB"));
    }

    #[test]
    fn recorded_empty_file_stays_a_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        fs::create_dir_all(&models).unwrap();
        let store = CacheStore::at(dir.path().join("cache.json"));
        let mut empty = descriptor(
            "empty.bin",
            "http://h/12",
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855",
        );
        empty.size_bytes = 0;
        store.record(1, 12, &empty).unwrap();
        fs::write(models.join("empty.bin"), b"").unwrap();

        let search = SearchPaths::new(vec![models.clone()]);
        let hit = store.cached_file(1, Some(12), &search).unwrap();
        assert_eq!(hit.path, models.join("empty.bin"));
        assert!(hit.path.exists());
    }
}

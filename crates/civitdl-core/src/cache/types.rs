//! Cache document types, validated at the JSON boundary.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::checksum::digests_match;

/// One downloadable file of a model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "DescriptorRepr")]
pub struct FileDescriptor {
    pub id: u64,
    pub name: String,
    pub download_url: String,
    pub size_bytes: u64,
    /// Uppercase hex SHA-256, when the catalog publishes one.
    pub sha256: Option<String>,
    pub model_type: String,
    pub trained_words: Vec<String>,
}

/// Accepts the current shape and the older history shape
/// (`hashes.SHA256`, `sizeKB`, snake_case annotations).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorRepr {
    #[serde(default)]
    id: u64,
    name: String,
    #[serde(default)]
    download_url: String,
    #[serde(default)]
    size_bytes: Option<u64>,
    #[serde(default, rename = "sizeKB")]
    size_kb: Option<f64>,
    #[serde(default)]
    sha256: Option<String>,
    #[serde(default)]
    hashes: HashMap<String, String>,
    #[serde(default, alias = "model_type")]
    model_type: String,
    #[serde(default, alias = "trained_words")]
    trained_words: Vec<String>,
}

impl From<DescriptorRepr> for FileDescriptor {
    fn from(r: DescriptorRepr) -> Self {
        let sha256 = r
            .sha256
            .or_else(|| {
                r.hashes
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("sha256"))
                    .map(|(_, v)| v.clone())
            })
            .filter(|h| !h.trim().is_empty())
            .map(|h| h.trim().to_ascii_uppercase());
        let size_bytes = r
            .size_bytes
            .or_else(|| r.size_kb.map(kb_to_bytes))
            .unwrap_or(0);
        FileDescriptor {
            id: r.id,
            name: r.name,
            download_url: r.download_url,
            size_bytes,
            sha256,
            model_type: r.model_type,
            trained_words: r.trained_words,
        }
    }
}

/// Catalog sizes are in KiB with a fractional part.
pub fn kb_to_bytes(kb: f64) -> u64 {
    if kb.is_finite() && kb > 0.0 {
        (kb * 1024.0).round() as u64
    } else {
        0
    }
}

/// Files known for one version of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: u64,
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

/// A cache entry matched by digest.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub model_id: u64,
    pub version_id: u64,
    pub descriptor: FileDescriptor,
}

/// The whole cache document: model id (as a string) to its known versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheIndex {
    models: BTreeMap<String, Vec<VersionRecord>>,
}

impl CacheIndex {
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model ids in key order. Keys that are not numbers are skipped.
    pub fn model_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.models.keys().filter_map(|k| k.parse().ok())
    }

    pub fn versions(&self, model_id: u64) -> &[VersionRecord] {
        self.models
            .get(&model_id.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn version(&self, model_id: u64, version_id: u64) -> Option<&VersionRecord> {
        self.versions(model_id).iter().find(|v| v.id == version_id)
    }

    /// Descriptor named `name` under `model_id@version_id`.
    pub fn descriptor(&self, model_id: u64, version_id: u64, name: &str) -> Option<&FileDescriptor> {
        self.version(model_id, version_id)?
            .files
            .iter()
            .find(|f| f.name == name)
    }

    /// Append-if-absent: adds the version record when missing, then the file
    /// when no file of that version has the same download URL. Returns true if
    /// anything changed.
    pub fn record(&mut self, model_id: u64, version_id: u64, descriptor: &FileDescriptor) -> bool {
        let versions = self.models.entry(model_id.to_string()).or_default();
        let record = match versions.iter_mut().position(|v| v.id == version_id) {
            Some(i) => &mut versions[i],
            None => {
                versions.push(VersionRecord {
                    id: version_id,
                    files: Vec::new(),
                });
                let last = versions.len() - 1;
                &mut versions[last]
            }
        };
        if record
            .files
            .iter()
            .any(|f| f.download_url == descriptor.download_url)
        {
            return false;
        }
        record.files.push(descriptor.clone());
        true
    }

    /// First descriptor whose SHA-256 equals `digest`, case-insensitively.
    pub fn find_by_hash(&self, digest: &str) -> Option<CacheHit> {
        for (model_key, versions) in &self.models {
            let Ok(model_id) = model_key.parse::<u64>() else {
                continue;
            };
            for v in versions {
                if let Some(f) = v
                    .files
                    .iter()
                    .find(|f| f.sha256.as_deref().is_some_and(|h| digests_match(h, digest)))
                {
                    return Some(CacheHit {
                        model_id,
                        version_id: v.id,
                        descriptor: f.clone(),
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, url: &str, sha: Option<&str>) -> FileDescriptor {
        FileDescriptor {
            id: 1,
            name: name.to_string(),
            download_url: url.to_string(),
            size_bytes: 4000,
            sha256: sha.map(str::to_string),
            model_type: "LORA".to_string(),
            trained_words: vec!["foo style".to_string()],
        }
    }

    #[test]
    fn serializes_in_documented_shape() {
        let mut idx = CacheIndex::default();
        idx.record(1001, 2002, &descriptor("foo.safetensors", "http://h/d/2002", Some("AB")));
        let v: serde_json::Value = serde_json::to_value(&idx).unwrap();
        let file = &v["1001"][0]["files"][0];
        assert_eq!(v["1001"][0]["id"], 2002);
        assert_eq!(file["name"], "foo.safetensors");
        assert_eq!(file["downloadUrl"], "http://h/d/2002");
        assert_eq!(file["sizeBytes"], 4000);
        assert_eq!(file["sha256"], "AB");
        assert_eq!(file["modelType"], "LORA");
        assert_eq!(file["trainedWords"][0], "foo style");
    }

    #[test]
    fn record_is_append_if_absent() {
        let mut idx = CacheIndex::default();
        let a = descriptor("a.safetensors", "http://h/a", None);
        let b = descriptor("b.safetensors", "http://h/b", None);
        assert!(idx.record(1, 10, &a));
        assert!(!idx.record(1, 10, &a));
        assert!(idx.record(1, 10, &b));
        assert!(idx.record(1, 11, &a));
        assert_eq!(idx.versions(1).len(), 2);
        assert_eq!(idx.version(1, 10).unwrap().files.len(), 2);
        assert_eq!(idx.versions(2).len(), 0);
    }

    #[test]
    fn find_by_hash_ignores_case() {
        let mut idx = CacheIndex::default();
        idx.record(5, 50, &descriptor("x.pt", "http://h/x", Some("ABCDEF")));
        let hit = idx.find_by_hash("abcdef").unwrap();
        assert_eq!((hit.model_id, hit.version_id), (5, 50));
        assert_eq!(hit.descriptor.name, "x.pt");
        assert!(idx.find_by_hash("000000").is_none());
    }

    #[test]
    fn reads_legacy_history_fields() {
        let doc = r#"{
            "7": [{"id": 70, "files": [{
                "id": 3, "name": "old.safetensors", "downloadUrl": "http://h/old",
                "sizeKB": 2.5, "hashes": {"SHA256": "deadbeef"},
                "model_type": "Checkpoint", "trained_words": ["w"]
            }]}]
        }"#;
        let idx: CacheIndex = serde_json::from_str(doc).unwrap();
        let f = idx.descriptor(7, 70, "old.safetensors").unwrap();
        assert_eq!(f.size_bytes, 2560);
        assert_eq!(f.sha256.as_deref(), Some("DEADBEEF"));
        assert_eq!(f.model_type, "Checkpoint");
        assert_eq!(f.trained_words, vec!["w"]);
    }

    #[test]
    fn kb_conversion_rounds() {
        assert_eq!(kb_to_bytes(1.0), 1024);
        assert_eq!(kb_to_bytes(3.90625), 4000);
        assert_eq!(kb_to_bytes(-1.0), 0);
        assert_eq!(kb_to_bytes(f64::NAN), 0);
    }
}

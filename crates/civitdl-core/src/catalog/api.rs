//! Wire types for the catalog's JSON responses.

use std::collections::HashMap;

use serde::Deserialize;

use crate::cache::{kb_to_bytes, FileDescriptor};
use crate::checksum::digests_match;

/// `GET {api}/models/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub model_versions: Vec<ApiVersion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVersion {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub trained_words: Vec<String>,
    #[serde(default)]
    pub files: Vec<ApiFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFile {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default, rename = "sizeKB")]
    pub size_kb: f64,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub hashes: HashMap<String, String>,
}

impl ApiFile {
    /// Uppercase SHA-256 from `hashes`, if published.
    pub fn sha256(&self) -> Option<String> {
        self.hashes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("sha256"))
            .map(|(_, v)| v.trim().to_ascii_uppercase())
            .filter(|v| !v.is_empty())
    }

    /// Descriptor annotated with the model type and the version's trained words.
    pub fn to_descriptor(&self, model_type: &str, trained_words: &[String]) -> FileDescriptor {
        FileDescriptor {
            id: self.id,
            name: self.name.clone(),
            download_url: self.download_url.clone(),
            size_bytes: kb_to_bytes(self.size_kb),
            sha256: self.sha256(),
            model_type: model_type.to_string(),
            trained_words: trained_words.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSummary {
    #[serde(default, rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub name: String,
}

/// `GET {api}/model-versions/by-hash/{sha256}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByHashResponse {
    pub id: u64,
    pub model_id: u64,
    #[serde(default)]
    pub model: ModelSummary,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub trained_words: Vec<String>,
    #[serde(default)]
    pub files: Vec<ApiFile>,
}

impl ByHashResponse {
    /// The file whose published SHA-256 is `digest`. Other files of the
    /// version never stand in for it.
    pub fn matching_file(&self, digest: &str) -> Option<&ApiFile> {
        self.files
            .iter()
            .find(|f| f.sha256().is_some_and(|h| digests_match(&h, digest)))
    }
}

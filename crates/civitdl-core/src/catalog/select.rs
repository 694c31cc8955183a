//! Version and file selection rules.

use super::api::{ApiFile, ApiVersion};

/// `version_id` when given, otherwise the version with the greatest id
/// (response order is not trusted).
pub fn select_version(versions: &[ApiVersion], version_id: Option<u64>) -> Option<&ApiVersion> {
    match version_id {
        Some(id) => versions.iter().find(|v| v.id == id),
        None => versions.iter().max_by_key(|v| v.id),
    }
}

/// The file whose download URL is the version's advertised download URL.
pub fn select_file(version: &ApiVersion) -> Option<&ApiFile> {
    if version.download_url.is_empty() {
        return None;
    }
    version
        .files
        .iter()
        .find(|f| f.download_url == version.download_url)
}

/// Allow-list membership, ignoring ASCII case. An empty list allows every type.
pub fn type_allowed(model_type: &str, allowed: &[String]) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(model_type))
}

//! Error taxonomy for resolution, download and verification.

use std::path::PathBuf;

use crate::retry::ChunkError;

/// Terminal failure of a resolve, download or lookup operation.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A request was answered with a non-2xx status. Not retried.
    #[error("remote unavailable: GET {url} returned HTTP {status}")]
    RemoteUnavailable { url: String, status: u32 },

    /// A catalog request never got an answer, even after retries.
    #[error("remote unreachable: GET {url}: {source}")]
    RemoteUnreachable {
        url: String,
        #[source]
        source: curl::Error,
    },

    /// The catalog's model type is not in the caller's allow-list.
    #[error("model type `{found}` is not one of: {}", allowed.join(", "))]
    InvalidModelType { found: String, allowed: Vec<String> },

    /// No file of the chosen version matched the selection rules.
    #[error("no downloadable file for model {model_id} (version {})", version_label(version_id))]
    NoDownloadableFile {
        model_id: u64,
        version_id: Option<u64>,
    },

    /// The cache claims a file for this version exists, and the catalog could
    /// not corroborate it.
    #[error("cache lists {name} for model {model_id}@{version_id} but the catalog cannot confirm it: {reason}")]
    StaleCache {
        model_id: u64,
        version_id: u64,
        name: String,
        reason: String,
    },

    /// No way to learn how many bytes to expect.
    #[error("could not determine the size of {url}")]
    UnknownSize { url: String },

    /// A chunk exhausted its retries. The `.part` file is left on disk.
    #[error("download incomplete: chunk {chunk} failed after {attempts} attempt(s): {source}")]
    IncompleteDownload {
        chunk: usize,
        attempts: u32,
        #[source]
        source: ChunkError,
    },

    /// The downloaded bytes do not hash to the expected digest. The file was deleted.
    #[error("SHA256 mismatch for {}: expected {expected}, got {actual}", path.display())]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A catalog body did not match the expected JSON shape.
    #[error("invalid response from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn version_label(version_id: &Option<u64>) -> String {
    match version_id {
        Some(v) => v.to_string(),
        None => "latest".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let e = FetchError::InvalidModelType {
            found: "Checkpoint".to_string(),
            allowed: vec!["LORA".to_string(), "LoCon".to_string()],
        };
        assert_eq!(e.to_string(), "model type `Checkpoint` is not one of: LORA, LoCon");

        let e = FetchError::NoDownloadableFile {
            model_id: 1001,
            version_id: None,
        };
        assert_eq!(e.to_string(), "no downloadable file for model 1001 (version latest)");

        let e = FetchError::RemoteUnavailable {
            url: "https://civitai.com/api/v1/models/1".to_string(),
            status: 500,
        };
        assert!(e.to_string().contains("HTTP 500"));
    }

    #[test]
    fn incomplete_download_keeps_chunk_cause() {
        let e = FetchError::IncompleteDownload {
            chunk: 2,
            attempts: 4,
            source: ChunkError::Http(200),
        };
        let source = std::error::Error::source(&e).expect("source");
        assert_eq!(source.to_string(), "expected HTTP 206, got HTTP 200");
    }
}

//! Reverse lookup of local files by SHA-256.

mod common;

use std::time::Duration;

use civitdl_core::cache::{CacheStore, SearchPaths};
use civitdl_core::catalog::CatalogClient;
use civitdl_core::lookup::{identify, lookup_digest, ProvenanceSource};
use civitdl_core::retry::RetryPolicy;
use common::test_server::TestServer;
use sha2::{Digest, Sha256};

fn client(server: &TestServer, dir: &std::path::Path) -> CatalogClient {
    let policy = RetryPolicy {
        max_attempts: 1,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
    };
    CatalogClient::new(
        &server.url("/api/v1"),
        CacheStore::at(dir.join("cache.json")),
        SearchPaths::default(),
        policy,
    )
}

#[test]
fn unknown_file_is_none_without_error() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("mystery.safetensors");
    std::fs::write(&file, b"nobody knows these bytes").unwrap();

    let found = identify(&client(&server, dir.path()), &file).unwrap();
    assert!(found.is_none());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].path.starts_with("/api/v1/model-versions/by-hash/"));
    assert!(!dir.path().join("cache.json").exists());
}

#[test]
fn catalog_hit_is_written_back_then_served_from_cache() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let data = b"ink wash lora weights".to_vec();
    let digest = hex::encode_upper(Sha256::digest(&data));
    let file = dir.path().join("ink.safetensors");
    std::fs::write(&file, &data).unwrap();

    let body = format!(
        r#"{{"id": 2002, "modelId": 1001, "model": {{"type": "LORA", "name": "Ink"}},
            "downloadUrl": "{dl}", "trainedWords": ["ink wash"],
            "files": [{{"id": 5, "name": "ink.safetensors", "sizeKB": 0.0205078125,
                        "downloadUrl": "{dl}", "hashes": {{"SHA256": "{digest}"}}}}]}}"#,
        dl = server.url("/api/download/models/2002"),
        digest = digest,
    );
    server.json(&format!("/api/v1/model-versions/by-hash/{}", digest), 200, &body);
    let catalog = client(&server, dir.path());

    let first = identify(&catalog, &file).unwrap().unwrap();
    assert_eq!(first.source, ProvenanceSource::Catalog);
    assert_eq!(first.air().to_string(), "1001@2002");
    assert_eq!(first.descriptor.trained_words, vec!["ink wash"]);
    assert_eq!(first.descriptor.size_bytes, 21);

    server.clear_log();
    let second = lookup_digest(&catalog, &digest.to_ascii_lowercase()).unwrap().unwrap();
    assert_eq!(second.source, ProvenanceSource::Cache);
    assert_eq!((second.model_id, second.version_id), (1001, 2002));
    assert_eq!(second.sha256, digest);
    assert!(server.requests().is_empty());
}

#[test]
fn catalog_failure_degrades_to_none() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let digest = "AB".repeat(32);
    server.json(&format!("/api/v1/model-versions/by-hash/{}", digest), 500, "{}");

    let found = lookup_digest(&client(&server, dir.path()), &digest).unwrap();
    assert!(found.is_none());
}

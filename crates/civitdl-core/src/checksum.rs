//! SHA-256 digests of files on disk.
//!
//! Digests are computed after a download completes (never inline with the
//! chunk writers) and are always rendered as uppercase hex, which is the form
//! the catalog publishes and the cache index stores.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of a file and return the digest as uppercase hex.
/// Reads fixed-size blocks so memory use does not grow with the file.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode_upper(hasher.finalize()))
}

/// Canonical form of a hex digest: trimmed, uppercase.
pub fn canonical_digest(digest: &str) -> String {
    digest.trim().to_ascii_uppercase()
}

/// Case-insensitive digest comparison.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

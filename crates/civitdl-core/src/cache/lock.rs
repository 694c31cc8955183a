//! Exclusive advisory lock serializing cache read-modify-write cycles.

use anyhow::{Context, Result};
use fs4::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Held for the duration of one mutation; the OS lock is released when the
/// file handle is dropped.
#[derive(Debug)]
pub(crate) struct CacheLock {
    _file: File,
}

/// Lock file next to the index: `cache.json` -> `cache.json.lock`.
pub(crate) fn lock_path(index_path: &Path) -> PathBuf {
    let mut o = index_path.as_os_str().to_owned();
    o.push(".lock");
    PathBuf::from(o)
}

/// Blocks until this process holds the exclusive lock for `index_path`.
pub(crate) fn acquire(index_path: &Path) -> Result<CacheLock> {
    let path = lock_path(index_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache directory {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("failed to open cache lock {}", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("failed to lock {}", path.display()))?;
    Ok(CacheLock { _file: file })
}

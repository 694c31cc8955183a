//! Ordered search directories for files already on disk.

use std::fs;
use std::path::{Path, PathBuf};

/// Ordered list of directories; the first match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Returns the first `dir/name` that exists as a file.
    ///
    /// When `expected_size` is non-zero, a zero-length file is what an
    /// aborted preallocation leaves behind; it is removed and the search
    /// continues. A file expected to be empty is returned as is.
    pub fn find(&self, name: &str, expected_size: u64) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        for dir in &self.dirs {
            let candidate = dir.join(name);
            let Ok(meta) = fs::metadata(&candidate) else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            if meta.len() == 0 && expected_size > 0 {
                tracing::warn!(path = %candidate.display(), "removing empty leftover file");
                let _ = fs::remove_file(&candidate);
                continue;
            }
            return Some(candidate);
        }
        None
    }

    /// Walks every directory recursively for a file whose name or stem equals
    /// `name`, ignoring ASCII case.
    pub fn find_by_stem(&self, name: &str) -> Option<PathBuf> {
        self.dirs.iter().find_map(|d| walk_for(d, name))
    }
}

fn walk_for(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(ft) = entry.file_type() else {
            continue;
        };
        if ft.is_dir() {
            subdirs.push(path);
        } else if matches_name(&path, name) {
            return Some(path);
        }
    }
    subdirs.sort();
    subdirs.iter().find_map(|d| walk_for(d, name))
}

fn matches_name(path: &Path, name: &str) -> bool {
    let eq = |s: Option<&std::ffi::OsStr>| {
        s.and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case(name))
    };
    eq(path.file_name()) || eq(path.file_stem())
}

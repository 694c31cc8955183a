//! Builder for creating and sizing `.part` download files.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::writer::StorageWriter;

/// Builder for a new staging file. Call `preallocate` then `build` to get a
/// `StorageWriter` that chunk workers share for positional writes.
pub struct StorageWriterBuilder {
    file: File,
    temp_path: PathBuf,
}

impl StorageWriterBuilder {
    /// Create a new staging file at `temp_path` (e.g. `model.safetensors.part`).
    /// Truncates whatever was there from an earlier failed run.
    pub fn create(temp_path: &Path) -> Result<Self> {
        if let Some(parent) = temp_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create dir: {}", parent.display()))?;
            }
        }
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(StorageWriterBuilder {
            file,
            temp_path: temp_path.to_path_buf(),
        })
    }

    /// Size the file to `size` bytes by writing a single zero byte at
    /// `size - 1`. The file stays sparse; every later chunk write lands inside
    /// the already-sized region.
    pub fn preallocate(&mut self, size: u64) -> Result<()> {
        if size == 0 {
            return Ok(());
        }
        let writer = StorageWriter::from_file_and_path(
            self.file.try_clone().context("clone temp file handle")?,
            self.temp_path.clone(),
        );
        writer
            .write_at(size - 1, &[0u8])
            .context("failed to preallocate file")?;
        Ok(())
    }

    /// Finish building and return a writer that can be shared for concurrent writes.
    pub fn build(self) -> StorageWriter {
        StorageWriter::from_file_and_path(self.file, self.temp_path)
    }
}

//! Disk I/O and file lifecycle for downloads.
//!
//! Sizes a `.part` staging file up front (sparse trailing-byte write),
//! supports concurrent positional writes from chunk workers, and renames the
//! staging file onto the target once every chunk has landed.

mod builder;
mod writer;

use std::path::{Path, PathBuf};

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

/// Staging file suffix used before the final rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the staging file: appends `.part` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

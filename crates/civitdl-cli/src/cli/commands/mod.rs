//! CLI command handlers, one per file.

mod cache;
mod checksum;
mod fetch;
mod lookup;

pub use cache::run_cache;
pub use checksum::run_checksum;
pub use fetch::{run_fetch, FetchArgs};
pub use lookup::run_lookup;

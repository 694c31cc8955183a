//! `civitdl cache` – list the cache index.

use anyhow::Result;
use civitdl_core::cache::CacheStore;
use civitdl_core::config::CivitdlConfig;

pub fn run_cache(cfg: &CivitdlConfig, model: Option<u64>) -> Result<()> {
    let store = CacheStore::open(cfg.cache_path.as_deref())?;
    let index = store.load();
    let ids: Vec<u64> = match model {
        Some(id) => vec![id],
        None => index.model_ids().collect(),
    };

    let mut rows = 0usize;
    for id in ids {
        for version in index.versions(id) {
            for file in &version.files {
                if rows == 0 {
                    println!("{:<18} {:<12} {:<12} {}", "AIR", "TYPE", "SIZE", "FILE");
                }
                println!(
                    "{:<18} {:<12} {:<12} {}",
                    format!("{}@{}", id, version.id),
                    file.model_type,
                    file.size_bytes,
                    file.name
                );
                rows += 1;
            }
        }
    }
    if rows == 0 {
        println!("No cached entries in {}.", store.path().display());
    }
    Ok(())
}

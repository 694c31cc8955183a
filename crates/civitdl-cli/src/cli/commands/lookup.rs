//! `civitdl lookup` – identify a local file by its SHA-256.

use anyhow::{bail, Result};
use civitdl_core::config::CivitdlConfig;
use civitdl_core::lookup;
use civitdl_core::Orchestrator;
use std::path::PathBuf;

pub async fn run_lookup(cfg: CivitdlConfig, arg: &str) -> Result<()> {
    let direct = PathBuf::from(arg);
    let path = if direct.is_file() {
        direct
    } else {
        match cfg.search_paths().find_by_stem(arg) {
            Some(p) => p,
            None => bail!("no file named {} here or in the search paths", arg),
        }
    };

    let orch = Orchestrator::from_config(&cfg)?;
    let target = path.clone();
    let found =
        tokio::task::spawn_blocking(move || lookup::identify(orch.catalog(), &target)).await??;

    match found {
        Some(p) => {
            println!("{}", p.air());
            println!("  file:    {}", path.display());
            println!("  name:    {}", p.descriptor.name);
            println!("  type:    {}", p.descriptor.model_type);
            println!("  sha256:  {}", p.sha256);
            if !p.descriptor.trained_words.is_empty() {
                println!("  words:   {}", p.descriptor.trained_words.join(", "));
            }
        }
        None => println!("unknown provenance: {}", path.display()),
    }
    Ok(())
}

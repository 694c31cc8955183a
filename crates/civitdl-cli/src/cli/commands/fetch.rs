//! `civitdl fetch` – resolve, download and verify one model file.

use anyhow::Result;
use civitdl_core::config::CivitdlConfig;
use civitdl_core::progress::ProgressStats;
use civitdl_core::{AirTag, Orchestrator};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub air: AirTag,
    pub types: Vec<String>,
    pub chunks: Option<usize>,
    pub retries: Option<u32>,
    pub save_dir: Option<PathBuf>,
}

/// Command-line overrides on top of the config file.
fn apply_overrides(mut cfg: CivitdlConfig, args: &FetchArgs) -> CivitdlConfig {
    if !args.types.is_empty() {
        cfg.allowed_types = args.types.clone();
    }
    if let Some(n) = args.chunks {
        cfg.download_chunks = n;
    }
    if let Some(n) = args.retries {
        cfg.max_chunk_retries = n;
    }
    if let Some(dir) = &args.save_dir {
        cfg.save_dir = dir.clone();
    }
    cfg
}

pub async fn run_fetch(cfg: CivitdlConfig, args: FetchArgs) -> Result<()> {
    let cfg = apply_overrides(cfg, &args);
    let orch = Orchestrator::from_config(&cfg)?;
    let tag = args.air;

    let (tx, mut rx) = tokio::sync::mpsc::channel::<ProgressStats>(64);
    let printer = tokio::spawn(async move {
        let mut shown = false;
        while let Some(stats) = rx.recv().await {
            print_progress(&stats);
            shown = true;
        }
        if shown {
            eprintln!();
        }
    });

    let result = tokio::task::spawn_blocking(move || {
        let mut sink = tx;
        orch.fetch(tag, &mut sink)
    })
    .await?;
    let _ = printer.await;

    let outcome = result?;
    if !outcome.downloaded() {
        tracing::info!(%tag, "served from disk");
    }
    println!("{}", outcome.path.display());
    println!("{}", outcome.air());
    Ok(())
}

fn print_progress(stats: &ProgressStats) {
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    eprint!(
        "\r{:>5.1}%  {}/{} bytes  {:.1} MiB/s  chunks {}/{}  eta {}   ",
        stats.fraction() * 100.0,
        stats.bytes_done,
        stats.total_bytes,
        stats.bytes_per_sec() / (1024.0 * 1024.0),
        stats.chunks_done,
        stats.chunk_count,
        eta
    );
    let _ = std::io::stderr().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let args = FetchArgs {
            air: AirTag::new(1, None),
            types: vec!["Checkpoint".to_string()],
            chunks: Some(2),
            retries: Some(5),
            save_dir: Some(PathBuf::from("/tmp/models")),
        };
        let cfg = apply_overrides(CivitdlConfig::default(), &args);
        assert_eq!(cfg.allowed_types, vec!["Checkpoint"]);
        assert_eq!(cfg.download_chunks, 2);
        assert_eq!(cfg.max_chunk_retries, 5);
        assert_eq!(cfg.save_dir, PathBuf::from("/tmp/models"));
    }

    #[test]
    fn no_overrides_keep_config() {
        let args = FetchArgs {
            air: AirTag::new(1, None),
            types: Vec::new(),
            chunks: None,
            retries: None,
            save_dir: None,
        };
        let cfg = apply_overrides(CivitdlConfig::default(), &args);
        assert_eq!(cfg.allowed_types, CivitdlConfig::default().allowed_types);
        assert_eq!(cfg.download_chunks, 8);
    }
}

//! CLI for civitdl.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use civitdl_core::config;
use civitdl_core::AirTag;
use std::path::PathBuf;

use commands::{run_cache, run_checksum, run_fetch, run_lookup, FetchArgs};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "civitdl")]
#[command(about = "Fetch catalog models by AIR tag with parallel chunked downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve, download and verify a model file.
    Fetch {
        /// MODEL_ID or MODEL_ID@VERSION_ID.
        air: AirTag,
        /// Accepted model type (repeatable); defaults to `allowed_types` from the config.
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
        /// Concurrent chunks (1-16).
        #[arg(long, value_name = "N")]
        chunks: Option<usize>,
        /// Retries per chunk.
        #[arg(long, value_name = "N")]
        retries: Option<u32>,
        /// Directory to save into.
        #[arg(long, value_name = "DIR")]
        save_dir: Option<PathBuf>,
    },

    /// Identify a local file (path, or a name searched for in the search paths).
    Lookup {
        path: String,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        path: PathBuf,
    },

    /// List cached model/version/file entries.
    Cache {
        /// Only this model.
        #[arg(long, value_name = "ID")]
        model: Option<u64>,
    },
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                air,
                types,
                chunks,
                retries,
                save_dir,
            } => {
                let args = FetchArgs {
                    air,
                    types,
                    chunks,
                    retries,
                    save_dir,
                };
                run_fetch(cfg, args).await?
            }
            CliCommand::Lookup { path } => run_lookup(cfg, &path).await?,
            CliCommand::Checksum { path } => run_checksum(&path).await?,
            CliCommand::Cache { model } => run_cache(&cfg, model)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

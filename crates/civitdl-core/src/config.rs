//! User configuration at `$XDG_CONFIG_HOME/civitdl/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::SearchPaths;
use crate::downloader::{CurlOptions, MAX_CHUNKS};
use crate::retry::RetryPolicy;

pub const DEFAULT_API_BASE: &str = "https://civitai.com/api/v1";

/// Backoff curve (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per catalog request, including the first.
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_allowed_types() -> Vec<String> {
    ["Checkpoint", "LORA", "LoCon"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_download_chunks() -> usize {
    8
}

fn default_max_chunk_retries() -> u32 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// Global configuration loaded from `~/.config/civitdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivitdlConfig {
    /// Catalog API root, without a trailing slash.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Directory new downloads are written to.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    /// Extra directories searched for already-downloaded files, after `save_dir`.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    /// Model types `fetch` accepts.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Concurrent chunks per download (clamped to 1..=16).
    #[serde(default = "default_download_chunks")]
    pub download_chunks: usize,
    /// Retries per chunk before the download fails.
    #[serde(default = "default_max_chunk_retries")]
    pub max_chunk_retries: u32,
    /// Cache index location; defaults to `$XDG_DATA_HOME/civitdl/cache.json`.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Log raw catalog responses at debug level.
    #[serde(default)]
    pub debug_response: bool,
    /// Optional backoff settings; built-in defaults when missing.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for CivitdlConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            save_dir: default_save_dir(),
            search_paths: Vec::new(),
            allowed_types: default_allowed_types(),
            download_chunks: default_download_chunks(),
            max_chunk_retries: default_max_chunk_retries(),
            cache_path: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            debug_response: false,
            retry: None,
        }
    }
}

impl CivitdlConfig {
    /// Chunk count clamped to what the downloader supports.
    pub fn chunk_count(&self) -> usize {
        self.download_chunks.clamp(1, MAX_CHUNKS)
    }

    /// Policy for catalog requests.
    pub fn catalog_retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }

    /// Same backoff curve, with `max_chunk_retries` retries per chunk.
    pub fn chunk_retry_policy(&self) -> RetryPolicy {
        self.catalog_retry_policy()
            .with_max_retries(self.max_chunk_retries)
    }

    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            ..CurlOptions::default()
        }
    }

    /// `save_dir` first, then the configured search paths.
    pub fn search_paths(&self) -> SearchPaths {
        let mut dirs = vec![self.save_dir.clone()];
        dirs.extend(self.search_paths.iter().cloned());
        SearchPaths::new(dirs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("civitdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CivitdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CivitdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CivitdlConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CivitdlConfig::default();
        assert_eq!(cfg.api_base, "https://civitai.com/api/v1");
        assert_eq!(cfg.allowed_types, vec!["Checkpoint", "LORA", "LoCon"]);
        assert_eq!(cfg.download_chunks, 8);
        assert_eq!(cfg.max_chunk_retries, 30);
        assert!(cfg.retry.is_none());
        assert!(!cfg.debug_response);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CivitdlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CivitdlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.api_base, cfg.api_base);
        assert_eq!(parsed.save_dir, cfg.save_dir);
        assert_eq!(parsed.download_chunks, cfg.download_chunks);
        assert_eq!(parsed.max_chunk_retries, cfg.max_chunk_retries);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            save_dir = "/srv/models"
            search_paths = ["/mnt/a", "/mnt/b"]
            download_chunks = 64
        "#;
        let cfg: CivitdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.save_dir, PathBuf::from("/srv/models"));
        assert_eq!(cfg.chunk_count(), 16);
        assert_eq!(cfg.max_chunk_retries, 30);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(
            cfg.search_paths().dirs(),
            &[
                PathBuf::from("/srv/models"),
                PathBuf::from("/mnt/a"),
                PathBuf::from("/mnt/b")
            ]
        );
    }

    #[test]
    fn config_toml_with_retry_section() {
        let toml = r#"
            max_chunk_retries = 3
            [retry]
            max_attempts = 2
            base_delay_secs = 0.5
            max_delay_secs = 10
        "#;
        let cfg: CivitdlConfig = toml::from_str(toml).unwrap();
        let catalog = cfg.catalog_retry_policy();
        assert_eq!(catalog.max_attempts, 2);
        assert_eq!(catalog.base_delay, Duration::from_millis(500));
        assert_eq!(catalog.max_delay, Duration::from_secs(10));
        let chunk = cfg.chunk_retry_policy();
        assert_eq!(chunk.max_retries(), 3);
        assert_eq!(chunk.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn zero_chunks_clamped_to_one() {
        let cfg = CivitdlConfig {
            download_chunks: 0,
            ..CivitdlConfig::default()
        };
        assert_eq!(cfg.chunk_count(), 1);
    }
}

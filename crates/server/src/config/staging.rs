use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Staging directories and expiry for uploads, chunks and downloads.
#[derive(Debug, Deserialize)]
pub struct StagingConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_chunk_dir")]
    pub chunk_dir: PathBuf,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Seconds a pending upload waits for a store action.
    #[serde(default = "default_upload_ttl")]
    pub upload_ttl_seconds: u64,
    /// Seconds a download token stays redeemable.
    #[serde(default = "default_download_ttl")]
    pub download_ttl_seconds: u64,
    /// Seconds between sweeps of expired entries and orphaned files.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Maximum live entries per store.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            chunk_dir: default_chunk_dir(),
            download_dir: default_download_dir(),
            upload_ttl_seconds: default_upload_ttl(),
            download_ttl_seconds: default_download_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
            max_entries: default_max_entries(),
        }
    }
}

impl StagingConfig {
    pub fn upload_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_ttl_seconds)
    }

    pub fn download_ttl(&self) -> Duration {
        Duration::from_secs(self.download_ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_chunk_dir() -> PathBuf {
    PathBuf::from("data/chunks")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_upload_ttl() -> u64 {
    3600
}

fn default_download_ttl() -> u64 {
    24 * 3600
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_max_entries() -> u64 {
    10_000
}

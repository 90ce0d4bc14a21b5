mod intent;
mod ledger;
mod pipeline;
mod seal;
mod server;
mod staging;
mod storage;
mod telemetry;


pub use intent::*;
pub use ledger::*;
pub use pipeline::*;
pub use seal::*;
pub use server::*;
pub use staging::*;
pub use storage::*;
pub use telemetry::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Harbor server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct HarborConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Ledger backend and operating signer.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Blob store backend and default retention.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Threshold key-server committee.
    #[serde(default)]
    pub seal: SealConfig,
    /// Upload, chunk and download staging directories.
    #[serde(default)]
    pub staging: StagingConfig,
    /// Chat intent extraction through a completion API.
    #[serde(default)]
    pub intent: IntentServerConfig,
    #[serde(default)]
    pub pipeline: PipelineServerConfig,
    /// Log output and OpenTelemetry export.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl HarborConfig {
    /// Load the configuration at `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ServerError> {
        toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))
    }
}

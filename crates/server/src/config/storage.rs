use harbor_core::{DEFAULT_EPOCHS, RetentionParams};
use serde::Deserialize;

/// Blob store configuration.
///
/// # Example
///
/// ```toml
/// [storage]
/// backend = "walrus"
/// publisher_url = "https://publisher.walrus-testnet.walrus.space"
/// aggregator_url = "https://aggregator.walrus-testnet.walrus.space"
/// ```
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// `"memory"` or `"walrus"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    pub publisher_url: Option<String>,
    pub aggregator_url: Option<String>,
    /// Storage epochs used when a request does not name any.
    #[serde(default = "default_epochs")]
    pub default_epochs: u32,
    #[serde(default = "default_deletable")]
    pub default_deletable: bool,
    /// Request timeout in seconds for the HTTP backend.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            publisher_url: None,
            aggregator_url: None,
            default_epochs: default_epochs(),
            default_deletable: default_deletable(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl StorageConfig {
    pub fn default_retention(&self) -> RetentionParams {
        RetentionParams::new(self.default_deletable, self.default_epochs)
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}

fn default_epochs() -> u32 {
    DEFAULT_EPOCHS
}

fn default_deletable() -> bool {
    true
}

fn default_timeout() -> u64 {
    60
}

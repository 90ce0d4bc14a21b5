use harbor_ledger::PackageIds;
use secrecy::SecretString;
use serde::Deserialize;

/// Environment variable that overrides [`LedgerConfig::signer_key`].
pub const SIGNER_KEY_ENV: &str = "HARBOR_SIGNER_KEY";

/// Ledger backend configuration.
///
/// # Example
///
/// ```toml
/// [ledger]
/// backend = "memory"
/// allowlist_package = "0x...a1157"
/// file_nft_package = "0x...f11e00"
/// signer_key = "9f86d081884c7d65..."
/// ```
#[derive(Debug, Deserialize)]
pub struct LedgerConfig {
    /// Backend name. Only `"memory"` is built in.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Package id of the `allowlist` module.
    pub allowlist_package: Option<String>,
    /// Package id of the `file_nft` module.
    pub file_nft_package: Option<String>,
    /// Hex-encoded ed25519 secret of the operating account. A fresh key is
    /// generated when absent.
    pub signer_key: Option<SecretString>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            allowlist_package: None,
            file_nft_package: None,
            signer_key: None,
        }
    }
}

impl LedgerConfig {
    /// Configured package ids, falling back to the defaults per module.
    pub fn packages(&self) -> PackageIds {
        let defaults = PackageIds::default();
        PackageIds::new(
            self.allowlist_package
                .clone()
                .map_or(defaults.allowlist, Into::into),
            self.file_nft_package
                .clone()
                .map_or(defaults.file_nft, Into::into),
        )
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}

use harbor_seal::DEFAULT_SESSION_TTL_MINUTES;
use secrecy::SecretString;
use serde::Deserialize;

/// Threshold key-server committee configuration.
#[derive(Debug, Deserialize)]
pub struct SealConfig {
    /// Number of key servers that must release a share to decrypt.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    /// Identifiers of the key servers in the committee.
    #[serde(default = "default_key_servers")]
    pub key_servers: Vec<String>,
    /// Lifetime of session credentials in minutes.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: u32,
    /// Secret the local committee derives server keys from. A random one is
    /// generated when absent, so ciphertexts do not survive a restart.
    pub committee_secret: Option<SecretString>,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            key_servers: default_key_servers(),
            session_ttl_minutes: default_session_ttl(),
            committee_secret: None,
        }
    }
}

fn default_threshold() -> u8 {
    2
}

fn default_key_servers() -> Vec<String> {
    ["ks-1", "ks-2", "ks-3"].map(String::from).to_vec()
}

fn default_session_ttl() -> u32 {
    DEFAULT_SESSION_TTL_MINUTES
}

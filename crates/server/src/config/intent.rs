use harbor_intent::IntentConfig;
use secrecy::SecretString;
use serde::Deserialize;

/// Completion API used to extract chat action parameters.
///
/// When disabled, chat requests must carry their parameters explicitly.
///
/// # Example
///
/// ```toml
/// [intent]
/// enabled = true
/// endpoint = "https://api.openai.com/v1/chat/completions"
/// model = "gpt-4o-mini"
/// api_key = "sk-..."
/// ```
#[derive(Debug, Deserialize)]
pub struct IntentServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<SecretString>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for IntentServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_seconds: default_timeout(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

impl IntentServerConfig {
    /// Client configuration, or `None` when extraction is disabled.
    pub fn client_config(&self) -> Option<IntentConfig> {
        if !self.enabled {
            return None;
        }
        let api_key = self
            .api_key
            .clone()
            .unwrap_or_else(|| SecretString::new(String::new()));
        Some(
            IntentConfig::new(&self.endpoint, &self.model, api_key)
                .with_timeout(self.timeout_seconds)
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens),
        )
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_owned()
}

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    512
}

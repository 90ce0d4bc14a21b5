use serde::Deserialize;

/// Pipeline behaviour switches.
#[derive(Debug, Default, Deserialize)]
pub struct PipelineServerConfig {
    /// Run mint-gated stores of the operating account one at a time, so
    /// concurrent requests cannot race each other into extra collections.
    #[serde(default)]
    pub serialize_mint_store: bool,
}

use serde::{Deserialize, Serialize};

/// Default number of storage epochs a blob is kept for.
pub const DEFAULT_EPOCHS: u32 = 3;

/// Retention parameters passed to the blob store on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionParams {
    /// Whether the blob may be deleted before its end epoch.
    #[serde(default = "default_deletable")]
    pub deletable: bool,
    /// Number of epochs to keep the blob for. Must be at least 1.
    #[serde(default = "default_epochs")]
    pub epochs: u32,
}

impl RetentionParams {
    /// Create retention parameters.
    #[must_use]
    pub fn new(deletable: bool, epochs: u32) -> Self {
        Self { deletable, epochs }
    }

    /// Validate the parameters, returning a human-readable reason on error.
    pub fn validate(&self) -> Result<(), String> {
        if self.epochs == 0 {
            return Err("retention must be at least one epoch".to_owned());
        }
        Ok(())
    }
}

impl Default for RetentionParams {
    fn default() -> Self {
        Self {
            deletable: default_deletable(),
            epochs: default_epochs(),
        }
    }
}

fn default_deletable() -> bool {
    true
}

fn default_epochs() -> u32 {
    DEFAULT_EPOCHS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let params: RetentionParams = serde_json::from_str("{}").unwrap();
        assert!(params.deletable);
        assert_eq!(params.epochs, 3);
    }

    #[test]
    fn zero_epochs_is_invalid() {
        assert!(RetentionParams::new(true, 0).validate().is_err());
        assert!(RetentionParams::new(false, 1).validate().is_ok());
    }
}

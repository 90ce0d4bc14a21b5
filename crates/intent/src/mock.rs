use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::IntentError;
use crate::extractor::IntentExtractor;
use crate::intent::Intent;

/// An extractor that answers from a fixed table.
///
/// Intents without an entry extract to an empty object.
#[derive(Debug, Clone, Default)]
pub struct MockIntentExtractor {
    responses: HashMap<Intent, Value>,
}

impl MockIntentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `value` whenever `intent` is extracted.
    #[must_use]
    pub fn with_response(mut self, intent: Intent, value: Value) -> Self {
        self.responses.insert(intent, value);
        self
    }
}

#[async_trait]
impl IntentExtractor for MockIntentExtractor {
    async fn extract(
        &self,
        intent: Intent,
        _recent_messages: &str,
    ) -> Result<Value, IntentError> {
        Ok(self
            .responses
            .get(&intent)
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())))
    }
}

/// An extractor that always fails.
#[derive(Debug, Clone)]
pub struct FailingIntentExtractor {
    error_message: String,
}

impl FailingIntentExtractor {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
        }
    }
}

#[async_trait]
impl IntentExtractor for FailingIntentExtractor {
    async fn extract(
        &self,
        _intent: Intent,
        _recent_messages: &str,
    ) -> Result<Value, IntentError> {
        Err(IntentError::ApiError(self.error_message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_returns_configured_value() {
        let extractor =
            MockIntentExtractor::new().with_response(Intent::DownloadFile, json!({"blobId": "b"}));
        let v = extractor.extract(Intent::DownloadFile, "").await.unwrap();
        assert_eq!(v["blobId"], "b");
        let empty = extractor.extract(Intent::ListMyNfts, "").await.unwrap();
        assert_eq!(empty, json!({}));
    }

    #[tokio::test]
    async fn failing_extractor() {
        let extractor = FailingIntentExtractor::new("service unavailable");
        assert!(extractor.extract(Intent::CreateAllowlist, "").await.is_err());
    }
}

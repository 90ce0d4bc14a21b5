use async_trait::async_trait;
use serde_json::Value;

use crate::error::IntentError;
use crate::intent::Intent;

/// Turns recent conversation into the JSON parameters of one action.
#[async_trait]
pub trait IntentExtractor: Send + Sync + std::fmt::Debug {
    /// Extract the parameters for `intent` from the conversation text.
    ///
    /// The returned value is always a JSON object; interpretation of its
    /// fields (defaults, the `"null"` string) is left to
    /// [`ActionRequest::parse`](crate::ActionRequest::parse).
    async fn extract(&self, intent: Intent, recent_messages: &str)
    -> Result<Value, IntentError>;
}

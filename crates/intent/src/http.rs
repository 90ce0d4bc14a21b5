use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::IntentConfig;
use crate::error::IntentError;
use crate::extractor::IntentExtractor;
use crate::intent::Intent;
use crate::template::render_prompt;

const SYSTEM_PROMPT: &str =
    "You extract action parameters from a conversation. Reply with a single JSON object and nothing else.";

/// Intent extractor backed by an OpenAI-compatible chat completions API.
#[derive(Debug)]
pub struct HttpIntentExtractor {
    client: reqwest::Client,
    config: IntentConfig,
}

impl HttpIntentExtractor {
    /// Create a new HTTP extractor with the given configuration.
    pub fn new(config: IntentConfig) -> Result<Self, IntentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| IntentError::Configuration(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Parse the completion, stripping markdown code fences if present.
    fn parse_response(content: &str) -> Result<Value, IntentError> {
        let trimmed = content.trim();

        let json_str = if trimmed.starts_with("```") {
            let without_opening = if let Some(rest) = trimmed.strip_prefix("```json") {
                rest
            } else {
                trimmed.strip_prefix("```").unwrap_or(trimmed)
            };
            without_opening
                .strip_suffix("```")
                .unwrap_or(without_opening)
                .trim()
        } else {
            trimmed
        };

        let value: Value = serde_json::from_str(json_str).map_err(|e| {
            IntentError::ParseError(format!(
                "completion is not valid JSON: {e}. Raw content: {content}"
            ))
        })?;
        if !value.is_object() {
            return Err(IntentError::ParseError(format!(
                "completion is not a JSON object: {content}"
            )));
        }
        Ok(value)
    }
}

#[async_trait]
impl IntentExtractor for HttpIntentExtractor {
    async fn extract(
        &self,
        intent: Intent,
        recent_messages: &str,
    ) -> Result<Value, IntentError> {
        let prompt = render_prompt(intent, recent_messages)?;

        let request_body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ]
        });

        debug!(endpoint = %self.config.endpoint, model = %self.config.model, action = %intent, "sending extraction request");

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IntentError::Timeout(self.config.timeout_seconds)
                } else {
                    IntentError::HttpError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "completion API returned error");
            return Err(IntentError::ApiError(format!("HTTP {status}: {body}")));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| IntentError::ParseError(format!("failed to parse API response: {e}")))?;

        let content = response_json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                IntentError::ParseError(format!("unexpected response format: {response_json}"))
            })?;

        Self::parse_response(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> IntentConfig {
        IntentConfig::new(
            format!("{}/v1/chat/completions", server.uri()),
            "test-model",
            SecretString::new("sk-test".into()),
        )
    }

    #[test]
    fn parse_plain_object() {
        let v = HttpIntentExtractor::parse_response(r#"{"blobId": "b1"}"#).unwrap();
        assert_eq!(v["blobId"], "b1");
    }

    #[test]
    fn parse_object_with_markdown_fences() {
        let content = "```json\n{\"fileId\": \"abc\", \"allowlistId\": \"0x1\"}\n```";
        let v = HttpIntentExtractor::parse_response(content).unwrap();
        assert_eq!(v["allowlistId"], "0x1");
    }

    #[test]
    fn parse_rejects_non_object() {
        assert!(HttpIntentExtractor::parse_response("[1, 2]").is_err());
        assert!(HttpIntentExtractor::parse_response("no json here").is_err());
    }

    #[tokio::test]
    async fn extracts_from_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "```json\n{\"nft\": \"0x42\"}\n```"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let extractor = HttpIntentExtractor::new(config(&server)).unwrap();
        let v = extractor
            .extract(Intent::DownloadWithNft, "user: download with nft 0x42")
            .await
            .unwrap();
        assert_eq!(v, json!({"nft": "0x42"}));
    }

    #[tokio::test]
    async fn api_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let extractor = HttpIntentExtractor::new(config(&server)).unwrap();
        let err = extractor
            .extract(Intent::CreateAllowlist, "user: make a list")
            .await
            .unwrap_err();
        assert!(matches!(err, IntentError::ApiError(msg) if msg.contains("429")));
    }
}

use thiserror::Error;

/// Errors that can occur while turning a chat message into parameters.
#[derive(Debug, Error)]
pub enum IntentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("completion request timed out after {0}s")]
    Timeout(u64),

    /// Failed to parse the model response.
    #[error("failed to parse completion: {0}")]
    ParseError(String),

    /// The completion API returned an error response.
    #[error("completion API error: {0}")]
    ApiError(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The prompt template failed to render.
    #[error("template error: {0}")]
    Template(String),

    /// A required parameter is absent or has the wrong type.
    #[error("missing or invalid parameter `{0}`")]
    MissingField(&'static str),

    /// No action with that name exists.
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

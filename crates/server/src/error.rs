use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use harbor_intent::IntentError;
use harbor_staging::StagingError;
use thiserror::Error;

/// Errors that can occur when running the Harbor server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request is malformed or misses a field.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Upload or download staging failed.
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Chat parameters could not be extracted.
    #[error(transparent)]
    Intent(#[from] IntentError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Staging(e) => match e {
                StagingError::UploadNotFound(_) | StagingError::TokenNotFound => {
                    StatusCode::NOT_FOUND
                }
                StagingError::TokenExpired => StatusCode::GONE,
                StagingError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                StagingError::InvalidChunk { .. }
                | StagingError::InvalidUploadId(_)
                | StagingError::Incomplete { .. } => StatusCode::BAD_REQUEST,
                StagingError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Intent(e) => match e {
                IntentError::UnknownAction(_) => StatusCode::NOT_FOUND,
                IntentError::MissingField(_) | IntentError::ParseError(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                IntentError::Configuration(_) | IntentError::Template(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                IntentError::HttpError(_) | IntentError::ApiError(_) => StatusCode::BAD_GATEWAY,
                IntentError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_errors_map_to_client_statuses() {
        assert_eq!(
            ServerError::from(StagingError::TokenExpired).status(),
            StatusCode::GONE
        );
        assert_eq!(
            ServerError::from(StagingError::TooLarge { size: 2, limit: 1 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServerError::from(StagingError::UploadNotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn intent_errors_map_by_cause() {
        assert_eq!(
            ServerError::from(IntentError::UnknownAction("FLY".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::from(IntentError::MissingField("blobId")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServerError::from(IntentError::Timeout(30)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}

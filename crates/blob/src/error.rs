use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The blob's retention period has ended.
    #[error("blob expired: {0}")]
    Expired(String),

    /// Retention parameters were rejected before any write happened.
    #[error("invalid retention: {0}")]
    InvalidRetention(String),

    /// The blob was stored as permanent and cannot be deleted.
    #[error("blob is not deletable: {0}")]
    NotDeletable(String),

    /// The backend does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Transport-level failure talking to the storage network.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The storage network answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Storage(String),
}

impl BlobError {
    /// Whether the error means the blob is absent (missing or expired).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired(_))
    }
}

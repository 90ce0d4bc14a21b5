use thiserror::Error;

/// Errors from the staging stores.
#[derive(Debug, Error)]
pub enum StagingError {
    /// No pending upload exists for this id, or it has expired.
    #[error("upload not found: {0}")]
    UploadNotFound(String),

    /// Chunk coordinates are out of range or disagree with earlier chunks.
    #[error("invalid chunk for upload {upload_id}: {reason}")]
    InvalidChunk { upload_id: String, reason: String },

    /// Completion was requested before every chunk arrived.
    #[error("upload {upload_id} incomplete: {received} of {total} chunks received")]
    Incomplete {
        upload_id: String,
        received: u32,
        total: u32,
    },

    /// Upload ids may only contain ASCII alphanumerics, `-` and `_`.
    #[error("invalid upload id: {0}")]
    InvalidUploadId(String),

    /// The payload exceeds the configured limit.
    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// The download token is unknown or was already redeemed.
    #[error("download token not found")]
    TokenNotFound,

    /// The download token exists but is past its expiry.
    #[error("download token expired")]
    TokenExpired,

    #[error("staging I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StagingError {
    /// Whether the error means the requested item does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UploadNotFound(_) | Self::TokenNotFound | Self::TokenExpired
        )
    }
}

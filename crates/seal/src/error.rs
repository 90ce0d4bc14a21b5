use thiserror::Error;

/// Errors raised by threshold encryption and decryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealError {
    /// Encryption could not be performed (bad policy id, bad threshold).
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The ciphertext is malformed or fails authentication.
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Key servers refused to release key shares for this caller.
    #[error("access denied: {0}")]
    Unauthorized(String),

    /// Session credentials are expired, mis-signed or for another package.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// Not enough key servers answered to reach the threshold.
    #[error("key servers unavailable: {approvals} of {threshold} shares obtained")]
    KeyServerUnavailable { approvals: usize, threshold: usize },
}

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error taxonomy shared by every workflow.
///
/// The `Display` output starts with the error kind name so the text can be
/// rendered to chat users unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarborError {
    /// Encryption under the target policy failed; nothing was stored.
    #[error("EncryptionError: {0}")]
    Encryption(String),

    /// Ciphertext was malformed or could not be opened.
    #[error("DecryptionError: {0}")]
    Decryption(String),

    /// The caller lacks allowlist membership or NFT ownership.
    #[error("AuthorizationError: {0}")]
    Authorization(String),

    /// A blob write or read failed.
    #[error("StorageError: {0}")]
    Storage(String),

    /// A blob, ledger object or staged file does not exist.
    #[error("NotFoundError: {0}")]
    NotFound(String),

    /// A transaction was rejected or the ledger RPC failed.
    #[error("LedgerError: {0}")]
    Ledger(String),

    /// The request itself was invalid (missing file, bad parameters).
    #[error("InvalidRequest: {0}")]
    InvalidRequest(String),
}

impl HarborError {
    /// The discriminant, for structured responses and metrics.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encryption(_) => ErrorKind::Encryption,
            Self::Decryption(_) => ErrorKind::Decryption,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Storage(_) => ErrorKind::Storage,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Ledger(_) => ErrorKind::Ledger,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Discriminant of [`HarborError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "EncryptionError")]
    Encryption,
    #[serde(rename = "DecryptionError")]
    Decryption,
    #[serde(rename = "AuthorizationError")]
    Authorization,
    #[serde(rename = "StorageError")]
    Storage,
    #[serde(rename = "NotFoundError")]
    NotFound,
    #[serde(rename = "LedgerError")]
    Ledger,
    #[serde(rename = "InvalidRequest")]
    InvalidRequest,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Encryption => "EncryptionError",
            Self::Decryption => "DecryptionError",
            Self::Authorization => "AuthorizationError",
            Self::Storage => "StorageError",
            Self::NotFound => "NotFoundError",
            Self::Ledger => "LedgerError",
            Self::InvalidRequest => "InvalidRequest",
        };
        f.write_str(name)
    }
}

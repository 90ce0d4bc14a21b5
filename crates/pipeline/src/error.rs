//! Conversion of collaborator failures into the workflow error taxonomy.

use harbor_blob::BlobError;
use harbor_core::HarborError;
use harbor_ledger::LedgerError;
use harbor_seal::SealError;
use harbor_staging::StagingError;
use thiserror::Error;

/// Errors raised while assembling a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Ledger failures: aborts that deny access are authorization errors,
/// missing objects are not-found errors, everything else is a ledger error.
pub fn ledger_error(err: LedgerError) -> HarborError {
    if err.is_access_denied() {
        HarborError::Authorization(err.to_string())
    } else if let LedgerError::ObjectNotFound(id) = &err {
        HarborError::NotFound(format!("ledger object {id}"))
    } else {
        HarborError::Ledger(err.to_string())
    }
}

pub fn blob_error(err: BlobError) -> HarborError {
    if err.is_not_found() {
        HarborError::NotFound(err.to_string())
    } else {
        HarborError::Storage(err.to_string())
    }
}

/// Any failure while sealing data is an encryption error.
pub fn encrypt_error(err: SealError) -> HarborError {
    HarborError::Encryption(err.to_string())
}

pub fn decrypt_error(err: SealError) -> HarborError {
    match err {
        SealError::Unauthorized(_) | SealError::InvalidSession(_) => {
            HarborError::Authorization(err.to_string())
        }
        SealError::Encryption(_)
        | SealError::InvalidCiphertext(_)
        | SealError::KeyServerUnavailable { .. } => HarborError::Decryption(err.to_string()),
    }
}

pub fn staging_error(err: StagingError) -> HarborError {
    match err {
        e if e.is_not_found() => HarborError::NotFound(e.to_string()),
        e @ StagingError::TooLarge { .. } => HarborError::InvalidRequest(e.to_string()),
        e => HarborError::Storage(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::ErrorKind;
    use harbor_ledger::AbortCode;

    #[test]
    fn ledger_aborts_map_by_code() {
        let denied = LedgerError::Abort {
            module: "allowlist".into(),
            function: "seal_approve".into(),
            code: AbortCode::ENoAccess,
        };
        assert_eq!(ledger_error(denied).kind(), ErrorKind::Authorization);

        let sold_out = LedgerError::Abort {
            module: "file_nft".into(),
            function: "mint_access_nft".into(),
            code: AbortCode::ESoldOut,
        };
        assert_eq!(ledger_error(sold_out).kind(), ErrorKind::Ledger);

        let missing = LedgerError::ObjectNotFound("0x1".into());
        assert_eq!(ledger_error(missing).kind(), ErrorKind::NotFound);
        assert_eq!(
            ledger_error(LedgerError::Rpc("down".into())).kind(),
            ErrorKind::Ledger
        );
    }

    #[test]
    fn seal_errors_split_by_cause() {
        assert_eq!(
            decrypt_error(SealError::Unauthorized("no".into())).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            decrypt_error(SealError::InvalidCiphertext("bad magic".into())).kind(),
            ErrorKind::Decryption
        );
        assert_eq!(
            encrypt_error(SealError::InvalidCiphertext("x".into())).kind(),
            ErrorKind::Encryption
        );
    }

    #[test]
    fn blob_and_staging_errors() {
        assert_eq!(
            blob_error(BlobError::NotFound("b".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            staging_error(StagingError::TokenExpired).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            staging_error(StagingError::TooLarge { size: 2, limit: 1 }).kind(),
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn authorization_message_is_prefixed() {
        let err = decrypt_error(SealError::Unauthorized("not on allowlist".into()));
        assert!(err.to_string().starts_with("AuthorizationError"));
    }
}

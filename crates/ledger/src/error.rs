use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Abort codes raised by the `allowlist` and `file_nft` contract modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbortCode {
    /// Sender is not on the allowlist, or the id is outside the policy
    /// namespace.
    ENoAccess,
    /// The capability does not belong to the allowlist.
    EInvalidCap,
    /// The address is already a member.
    EDuplicate,
    /// The collection has minted its full supply.
    ESoldOut,
    /// The payment coin is below the mint price.
    EInsufficientPayment,
    /// The sender does not own the object.
    ENotOwner,
}

impl AbortCode {
    /// Numeric code as it would appear in a Move abort.
    #[must_use]
    pub fn code(self) -> u64 {
        match self {
            Self::ENoAccess => 1,
            Self::EInvalidCap => 2,
            Self::EDuplicate => 3,
            Self::ESoldOut => 4,
            Self::EInsufficientPayment => 5,
            Self::ENotOwner => 6,
        }
    }

    /// Whether the abort means the sender is not authorized.
    #[must_use]
    pub fn is_access_denied(self) -> bool {
        matches!(self, Self::ENoAccess | Self::ENotOwner)
    }
}

impl fmt::Display for AbortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors that can occur when building, signing or executing transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The object does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// A contract call aborted; the whole transaction was discarded.
    #[error("MoveAbort in {module}::{function}: {code} ({})", code.code())]
    Abort {
        module: String,
        function: String,
        code: AbortCode,
    },

    /// The transaction is structurally invalid (unknown function, bad
    /// argument types).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Signature or sender did not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The signer key could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A created object of the expected type is missing from the effects.
    #[error("transaction effects missing created {0}")]
    MissingCreatedObject(String),

    /// An object's fields did not have the expected shape.
    #[error("malformed object {id}: {reason}")]
    MalformedObject { id: String, reason: String },

    /// Transport-level failure talking to the RPC node.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Transaction bytes could not be (de)serialised.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// The abort code, when the error is a contract abort.
    #[must_use]
    pub fn abort_code(&self) -> Option<AbortCode> {
        match self {
            Self::Abort { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the error is an authorization failure raised by the contract.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        self.abort_code().is_some_and(AbortCode::is_access_denied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_display_names_the_call() {
        let err = LedgerError::Abort {
            module: "allowlist".into(),
            function: "seal_approve".into(),
            code: AbortCode::ENoAccess,
        };
        assert_eq!(
            err.to_string(),
            "MoveAbort in allowlist::seal_approve: ENoAccess (1)"
        );
        assert!(err.is_access_denied());
    }

    #[test]
    fn sold_out_is_not_access_denied() {
        let err = LedgerError::Abort {
            module: "file_nft".into(),
            function: "mint_access_nft".into(),
            code: AbortCode::ESoldOut,
        };
        assert!(!err.is_access_denied());
        assert!(!LedgerError::Rpc("down".into()).is_access_denied());
    }
}

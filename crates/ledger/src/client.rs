use async_trait::async_trait;
use harbor_core::{Address, ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::signer::{AgentSigner, SignedTransaction};
use crate::tx::Transaction;

/// An object created by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedObject {
    /// Fully qualified type, `package::module::Struct`.
    pub object_type: String,
    pub object_id: ObjectId,
}

/// The observable result of an executed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEffects {
    pub digest: String,
    pub created: Vec<CreatedObject>,
    pub mutated: Vec<ObjectId>,
}

impl TransactionEffects {
    /// Id of the first created object whose type ends with `::{suffix}`.
    #[must_use]
    pub fn created_of_type(&self, suffix: &str) -> Option<&ObjectId> {
        self.created
            .iter()
            .find(|c| type_matches(&c.object_type, suffix))
            .map(|c| &c.object_id)
    }

    /// Like [`created_of_type`](Self::created_of_type) but an error when
    /// missing.
    pub fn require_created(&self, suffix: &str) -> Result<ObjectId, LedgerError> {
        self.created_of_type(suffix)
            .cloned()
            .ok_or_else(|| LedgerError::MissingCreatedObject(suffix.to_owned()))
    }
}

/// A ledger object as returned by a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerObject {
    pub id: ObjectId,
    pub object_type: String,
    pub owner: Address,
    pub version: u64,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LedgerObject {
    /// Whether this object's type ends with `::{suffix}` (e.g.
    /// `file_nft::Collection`).
    #[must_use]
    pub fn is_type(&self, suffix: &str) -> bool {
        type_matches(&self.object_type, suffix)
    }

    pub fn str_field(&self, name: &str) -> Result<&str, LedgerError> {
        self.fields
            .get(name)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| self.malformed(name))
    }

    pub fn u64_field(&self, name: &str) -> Result<u64, LedgerError> {
        self.fields
            .get(name)
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| self.malformed(name))
    }

    /// A string field that may be `null` before it is first set.
    #[must_use]
    pub fn opt_str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn opt_u64_field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(serde_json::Value::as_u64)
    }

    fn malformed(&self, field: &str) -> LedgerError {
        LedgerError::MalformedObject {
            id: self.id.to_string(),
            reason: format!("missing or mistyped field `{field}`"),
        }
    }
}

fn type_matches(object_type: &str, suffix: &str) -> bool {
    object_type
        .strip_suffix(suffix)
        .is_some_and(|head| head.ends_with("::"))
}

/// Client for the smart-contract ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a signed transaction and wait for its effects.
    async fn execute(&self, tx: SignedTransaction) -> Result<TransactionEffects, LedgerError>;

    /// Sign `tx` with `signer` and submit it.
    async fn sign_and_execute(
        &self,
        tx: &Transaction,
        signer: &AgentSigner,
    ) -> Result<TransactionEffects, LedgerError> {
        let signed = signer.sign_transaction(tx)?;
        self.execute(signed).await
    }

    /// Read an object's current state.
    async fn read_object(&self, id: &ObjectId) -> Result<LedgerObject, LedgerError>;

    /// List objects owned by `owner` whose type ends with `struct_type`.
    async fn owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> Result<Vec<LedgerObject>, LedgerError>;

    /// Evaluate a transaction kind as `sender` without committing anything.
    ///
    /// Succeeds only if every call in the transaction would succeed.
    async fn dev_inspect(&self, kind_bytes: &[u8], sender: &Address) -> Result<(), LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_suffix_matching() {
        assert!(type_matches("0xb::file_nft::Collection", "file_nft::Collection"));
        assert!(type_matches("0xb::file_nft::Collection", "Collection"));
        assert!(!type_matches("0xb::file_nft::MyCollection", "Collection"));
        assert!(!type_matches("Collection", "Collection"));
    }

    #[test]
    fn require_created_reports_missing_type() {
        let effects = TransactionEffects {
            digest: "d".into(),
            created: vec![CreatedObject {
                object_type: "0xa::allowlist::Cap".into(),
                object_id: ObjectId::new("0x1"),
            }],
            mutated: vec![],
        };
        assert_eq!(effects.require_created("Cap").unwrap().as_str(), "0x1");
        assert!(matches!(
            effects.require_created("Allowlist"),
            Err(LedgerError::MissingCreatedObject(_))
        ));
    }
}

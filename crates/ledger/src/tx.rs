//! Transaction model and the access-control transaction builder.
//!
//! Builders here are pure: the same inputs always produce the same unsigned
//! transaction and nothing is remembered between calls. Submitting a
//! creation transaction twice creates two objects.

use harbor_core::{Address, BlobId, ObjectId, PolicyId, PolicyKind, ResourceType};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Allowlist module name.
pub const ALLOWLIST_MODULE: &str = "allowlist";
/// File NFT module name.
pub const FILE_NFT_MODULE: &str = "file_nft";
/// Name of the approval entry point both modules expose.
pub const SEAL_APPROVE: &str = "seal_approve";

/// A single argument passed to a contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Argument {
    /// Reference to an existing ledger object.
    Object(ObjectId),
    Address(Address),
    String(String),
    U8(u8),
    U64(u64),
    Bytes(Vec<u8>),
    /// A coin of the given value split from the sender's gas.
    Coin(u64),
}

/// One contract call inside a programmable transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCall {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
    pub arguments: Vec<Argument>,
}

impl MoveCall {
    /// `module::function`, for logs and errors.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}::{}", self.module, self.function)
    }
}

/// An unsigned programmable transaction: an ordered list of calls that
/// execute atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub calls: Vec<MoveCall>,
}

impl Transaction {
    #[must_use]
    pub fn new(calls: Vec<MoveCall>) -> Self {
        Self { calls }
    }

    /// Serialise only the transaction kind (no sender, no gas), the form
    /// consumed by dry-run evaluation.
    pub fn to_kind_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn from_kind_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

/// Published package ids of the two contract modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIds {
    pub allowlist: ObjectId,
    pub file_nft: ObjectId,
}

impl PackageIds {
    #[must_use]
    pub fn new(allowlist: impl Into<ObjectId>, file_nft: impl Into<ObjectId>) -> Self {
        Self {
            allowlist: allowlist.into(),
            file_nft: file_nft.into(),
        }
    }

    /// Package that implements the given policy kind.
    #[must_use]
    pub fn for_kind(&self, kind: PolicyKind) -> &ObjectId {
        match kind {
            PolicyKind::Allowlist => &self.allowlist,
            PolicyKind::MintGated => &self.file_nft,
        }
    }
}

impl Default for PackageIds {
    fn default() -> Self {
        Self::new(
            "0x00000000000000000000000000000000000000000000000000000000000a1157",
            "0x0000000000000000000000000000000000000000000000000000000000f11e00",
        )
    }
}

/// Storage metadata attached to a collection once its blob exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMetadata {
    pub blob_id: BlobId,
    pub file_name: String,
    pub file_size: u64,
    pub resource_type: ResourceType,
    pub end_epoch: u64,
}

/// Builds the access-control transactions used by the pipeline.
#[derive(Debug, Clone)]
pub struct AccessControlTx {
    packages: PackageIds,
}

impl AccessControlTx {
    #[must_use]
    pub fn new(packages: PackageIds) -> Self {
        Self { packages }
    }

    #[must_use]
    pub fn packages(&self) -> &PackageIds {
        &self.packages
    }

    fn call(&self, kind: PolicyKind, function: &str, arguments: Vec<Argument>) -> Transaction {
        Transaction::new(vec![MoveCall {
            package: self.packages.for_kind(kind).clone(),
            module: kind.module().to_owned(),
            function: function.to_owned(),
            arguments,
        }])
    }

    /// Create a new allowlist together with its capability object.
    #[must_use]
    pub fn create_allowlist(&self, name: &str) -> Transaction {
        self.call(
            PolicyKind::Allowlist,
            "create_allowlist_entry",
            vec![Argument::String(name.to_owned())],
        )
    }

    /// Add `member` to the allowlist, authorised by `cap`.
    #[must_use]
    pub fn add_member(&self, allowlist: &ObjectId, cap: &ObjectId, member: &Address) -> Transaction {
        self.call(
            PolicyKind::Allowlist,
            "add",
            vec![
                Argument::Object(allowlist.clone()),
                Argument::Object(cap.clone()),
                Argument::Address(member.clone()),
            ],
        )
    }

    /// Create an empty collection. Mint price is in base units.
    #[must_use]
    pub fn create_collection(&self, name: &str, max_supply: u64, mint_price: u64) -> Transaction {
        self.call(
            PolicyKind::MintGated,
            "create_collection",
            vec![
                Argument::String(name.to_owned()),
                Argument::U64(max_supply),
                Argument::U64(mint_price),
            ],
        )
    }

    /// Attach storage metadata to a collection created earlier.
    #[must_use]
    pub fn update_collection_metadata(
        &self,
        collection: &ObjectId,
        metadata: &CollectionMetadata,
    ) -> Transaction {
        self.call(
            PolicyKind::MintGated,
            "update_collection_metadata",
            vec![
                Argument::Object(collection.clone()),
                Argument::String(metadata.blob_id.to_string()),
                Argument::String(metadata.file_name.clone()),
                Argument::U64(metadata.file_size),
                Argument::U8(metadata.resource_type.as_u8()),
                Argument::U64(metadata.end_epoch),
            ],
        )
    }

    /// Mint an access NFT, paying `payment` base units.
    #[must_use]
    pub fn mint_access_nft(&self, collection: &ObjectId, payment: u64) -> Transaction {
        self.call(
            PolicyKind::MintGated,
            "mint_access_nft",
            vec![Argument::Object(collection.clone()), Argument::Coin(payment)],
        )
    }

    /// Build the approval proof for decrypting data sealed under
    /// `policy_id`. `access_object` is the allowlist for
    /// [`PolicyKind::Allowlist`] and the sender's NFT for
    /// [`PolicyKind::MintGated`].
    ///
    /// The result is never broadcast; key servers dry-run it.
    pub fn approve(
        &self,
        kind: PolicyKind,
        policy_id: &PolicyId,
        access_object: &ObjectId,
    ) -> Result<Transaction, LedgerError> {
        let id = policy_id
            .to_bytes()
            .map_err(|e| LedgerError::InvalidTransaction(format!("policy id {policy_id}: {e}")))?;
        Ok(self.call(
            kind,
            SEAL_APPROVE,
            vec![Argument::Bytes(id), Argument::Object(access_object.clone())],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> AccessControlTx {
        AccessControlTx::new(PackageIds::new("0xa", "0xb"))
    }

    #[test]
    fn create_allowlist_targets_allowlist_package() {
        let tx = builder().create_allowlist("team");
        assert_eq!(tx.calls.len(), 1);
        let call = &tx.calls[0];
        assert_eq!(call.package.as_str(), "0xa");
        assert_eq!(call.target(), "allowlist::create_allowlist_entry");
        assert_eq!(call.arguments, vec![Argument::String("team".into())]);
    }

    #[test]
    fn builder_is_pure() {
        let b = builder();
        assert_eq!(
            b.create_collection("c", 10, 1_000_000),
            b.create_collection("c", 10, 1_000_000)
        );
    }

    #[test]
    fn metadata_update_encodes_resource_type_as_u8() {
        let tx = builder().update_collection_metadata(
            &ObjectId::new("0xc"),
            &CollectionMetadata {
                blob_id: BlobId::new("blob"),
                file_name: "notes.txt".into(),
                file_size: 42,
                resource_type: ResourceType::Memory,
                end_epoch: 9,
            },
        );
        let call = &tx.calls[0];
        assert_eq!(call.package.as_str(), "0xb");
        assert_eq!(call.arguments[4], Argument::U8(1));
        assert_eq!(call.arguments[5], Argument::U64(9));
    }

    #[test]
    fn approve_uses_policy_bytes_and_kind_module() {
        let b = builder();
        let tx = b
            .approve(
                PolicyKind::MintGated,
                &PolicyId::new("0xA1"),
                &ObjectId::new("0xnft"),
            )
            .unwrap();
        let call = &tx.calls[0];
        assert_eq!(call.target(), "file_nft::seal_approve");
        assert_eq!(call.arguments[0], Argument::Bytes(vec![0xa1]));
        assert_eq!(call.arguments[1], Argument::Object(ObjectId::new("0xnft")));
    }

    #[test]
    fn approve_rejects_non_hex_policy() {
        let err = builder()
            .approve(
                PolicyKind::Allowlist,
                &PolicyId::new("not-hex"),
                &ObjectId::new("0x1"),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransaction(_)));
    }

    #[test]
    fn kind_bytes_round_trip() {
        let tx = builder().mint_access_nft(&ObjectId::new("0xc"), 5);
        let bytes = tx.to_kind_bytes().unwrap();
        assert_eq!(Transaction::from_kind_bytes(&bytes).unwrap(), tx);
        assert!(Transaction::from_kind_bytes(b"garbage").is_err());
    }
}

//! Request and result types of the pipeline operations.

use harbor_core::{
    AccessNft, BlobId, CollectionInfo, DownloadTicket, ObjectId, PolicyId, ResourceType,
    RetentionParams,
};
use serde::Serialize;

/// Name, supply and price of a new collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSpec {
    pub name: String,
    pub max_supply: u64,
    /// Mint price in base units.
    pub mint_price: u64,
}

/// Parameters of the mint-gated store workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintGatedStore {
    pub collection: CollectionSpec,
    pub file_name: String,
    pub resource_type: ResourceType,
    pub retention: RetentionParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReceipt {
    pub blob_id: BlobId,
    pub end_epoch: u64,
    /// Plaintext size in bytes.
    pub size: u64,
    pub policy_id: PolicyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintStoreReceipt {
    pub collection_id: ObjectId,
    pub collection: CollectionSpec,
    pub blob_id: BlobId,
    pub end_epoch: u64,
    pub file_name: String,
    pub file_size: u64,
    /// Digest of the metadata update transaction.
    pub digest: String,
}

/// Memory records re-inserted for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRestore {
    pub inserted: usize,
    pub skipped: usize,
}

/// What the mint-gated retrieve workflow produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resourceType", rename_all = "snake_case")]
pub enum MintRetrieveReceipt {
    Memory(MemoryRestore),
    File(DownloadTicket),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistReceipt {
    pub allowlist_id: ObjectId,
    pub cap_id: ObjectId,
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReceipt {
    pub collection_id: ObjectId,
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub nft_id: ObjectId,
    pub collection_id: ObjectId,
    /// Amount paid in base units.
    pub paid: u64,
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NftList {
    pub nfts: Vec<AccessNft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionList {
    pub collections: Vec<CollectionInfo>,
}

/// Where [`store_memories`](crate::Pipeline::store_memories) seals the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryTarget {
    Allowlist {
        policy_id: PolicyId,
        retention: RetentionParams,
    },
    MintGated {
        collection: CollectionSpec,
        retention: RetentionParams,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStoreReceipt {
    pub record_count: usize,
    pub blob_id: BlobId,
    pub end_epoch: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<MintStoreReceipt>,
}

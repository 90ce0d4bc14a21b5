use harbor_core::BlobId;
use serde::{Deserialize, Serialize};

/// What the storage network reports back after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub blob_id: BlobId,
    /// Last epoch (exclusive) the blob is guaranteed to be available.
    pub end_epoch: u64,
    pub deletable: bool,
    pub size: u64,
    /// `true` when the content was already stored and only certified again.
    #[serde(default)]
    pub already_certified: bool,
}

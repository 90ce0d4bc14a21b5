//! Request and response bodies of the HTTP API.

use harbor_core::{Address, BlobId, ObjectId, PolicyId, RetentionParams};
use harbor_pipeline::MetricsSnapshot;
use harbor_staging::{ChunkProgress, PendingUpload};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub address: Address,
    pub pending_uploads: u64,
    pub metrics: MetricsSnapshot,
}

/// A staged upload, returned by the upload routes.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(flatten)]
    pub upload: PendingUpload,
}

impl From<PendingUpload> for UploadResponse {
    fn from(upload: PendingUpload) -> Self {
        Self {
            success: true,
            upload,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    pub success: bool,
    pub upload_id: String,
    pub received: u32,
    pub total: u32,
    pub complete: bool,
}

impl ChunkResponse {
    pub fn new(upload_id: String, progress: ChunkProgress) -> Self {
        Self {
            success: true,
            upload_id,
            received: progress.received,
            total: progress.total,
            complete: progress.is_complete(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    pub upload_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIdQuery {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Optional retention fields, filled from the server defaults.
#[derive(Debug, Default, Deserialize)]
pub struct RetentionFields {
    pub deletable: Option<bool>,
    pub epochs: Option<u32>,
}

impl RetentionFields {
    pub fn or(&self, defaults: RetentionParams) -> RetentionParams {
        RetentionParams::new(
            self.deletable.unwrap_or(defaults.deletable),
            self.epochs.unwrap_or(defaults.epochs),
        )
    }
}

/// `POST /v1/workflows/store`: seal a pending upload under an allowlist.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    pub file_id: String,
    pub policy_id: PolicyId,
    #[serde(flatten)]
    pub retention: RetentionFields,
}

/// `POST /v1/workflows/retrieve`: decrypt a blob and stage it for download.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub blob_id: BlobId,
    pub policy_id: PolicyId,
    pub file_name: Option<String>,
}

/// `POST /v1/workflows/mint-store`: seal a pending upload under a new
/// collection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintStoreRequest {
    pub file_id: String,
    pub name: Option<String>,
    pub max_supply: Option<u64>,
    /// Mint price in base units.
    pub mint_price: Option<u64>,
    #[serde(flatten)]
    pub retention: RetentionFields,
}

/// `POST /v1/workflows/mint-retrieve`: open the content behind an NFT.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRetrieveRequest {
    pub nft_id: ObjectId,
    pub agent_id: String,
    pub entity_id: String,
    pub room_id: Option<String>,
}

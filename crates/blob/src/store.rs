use async_trait::async_trait;
use bytes::Bytes;
use harbor_core::{BlobId, RetentionParams};

use crate::error::BlobError;
use crate::types::BlobRecord;

/// Client for a content-addressed blob storage network.
///
/// A single `write_blob` call is atomic: on error no blob is left behind.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an opaque byte payload for the given retention.
    async fn write_blob(
        &self,
        data: Bytes,
        retention: RetentionParams,
    ) -> Result<BlobRecord, BlobError>;

    /// Read a blob back byte-for-byte.
    ///
    /// Returns [`BlobError::NotFound`] or [`BlobError::Expired`] when the
    /// blob is not available.
    async fn read_blob(&self, id: &BlobId) -> Result<Bytes, BlobError>;

    /// Delete a deletable blob before its end epoch.
    async fn delete_blob(&self, id: &BlobId) -> Result<(), BlobError>;
}

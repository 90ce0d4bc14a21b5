use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bytes::Bytes;
use dashmap::DashMap;
use harbor_core::{BlobId, RetentionParams};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::BlobError;
use crate::store::BlobStore;
use crate::types::BlobRecord;

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    end_epoch: u64,
    deletable: bool,
}

/// In-memory [`BlobStore`] with a manually advanced epoch clock.
///
/// Blob ids are content addressed (url-safe base64 of the SHA-256 digest),
/// so writing identical bytes twice yields the same id and extends the
/// retention to the later end epoch. Expired blobs are evicted lazily on
/// read.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<BlobId, Entry>,
    epoch: AtomicU64,
}

impl MemoryBlobStore {
    /// Create an empty store at epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current storage epoch.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Relaxed)
    }

    /// Move the epoch clock forward, returning the new epoch.
    pub fn advance_epoch(&self, by: u64) -> u64 {
        self.epoch.fetch_add(by, Ordering::Relaxed) + by
    }

    /// Number of blobs currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Compute the content id the store would assign to `data`.
    pub fn content_id(data: &[u8]) -> BlobId {
        BlobId::new(URL_SAFE_NO_PAD.encode(Sha256::digest(data)))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write_blob(
        &self,
        data: Bytes,
        retention: RetentionParams,
    ) -> Result<BlobRecord, BlobError> {
        retention.validate().map_err(BlobError::InvalidRetention)?;

        let blob_id = Self::content_id(&data);
        let size = data.len() as u64;
        let end_epoch = self.current_epoch() + u64::from(retention.epochs);
        let now = self.current_epoch();

        let mut already_certified = false;
        let mut stored_end = end_epoch;
        self.blobs
            .entry(blob_id.clone())
            .and_modify(|entry| {
                if entry.end_epoch > now {
                    already_certified = true;
                }
                entry.end_epoch = entry.end_epoch.max(end_epoch);
                entry.deletable = retention.deletable;
                stored_end = entry.end_epoch;
            })
            .or_insert_with(|| Entry {
                data,
                end_epoch,
                deletable: retention.deletable,
            });

        debug!(blob_id = %blob_id, size, end_epoch = stored_end, already_certified, "blob stored");

        Ok(BlobRecord {
            blob_id,
            end_epoch: stored_end,
            deletable: retention.deletable,
            size,
            already_certified,
        })
    }

    async fn read_blob(&self, id: &BlobId) -> Result<Bytes, BlobError> {
        let now = self.current_epoch();
        let Some(entry) = self.blobs.get(id) else {
            return Err(BlobError::NotFound(id.to_string()));
        };
        if entry.end_epoch <= now {
            drop(entry);
            self.blobs.remove(id);
            return Err(BlobError::Expired(id.to_string()));
        }
        Ok(entry.data.clone())
    }

    async fn delete_blob(&self, id: &BlobId) -> Result<(), BlobError> {
        let now = self.current_epoch();
        let deletable = match self.blobs.get(id) {
            Some(entry) if entry.end_epoch > now => entry.deletable,
            _ => return Err(BlobError::NotFound(id.to_string())),
        };
        if !deletable {
            return Err(BlobError::NotDeletable(id.to_string()));
        }
        self.blobs.remove(id);
        Ok(())
    }
}

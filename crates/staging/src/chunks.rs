use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::StagingError;
use crate::files::{remove_quietly, remove_stale_files};
use crate::sweeper::Sweepable;
use crate::upload::{PendingUpload, UploadStore};

#[derive(Debug)]
struct ChunkState {
    file_name: String,
    total: u32,
    /// Size of every received chunk, by index.
    received: BTreeMap<u32, u64>,
}

impl ChunkState {
    fn bytes(&self) -> u64 {
        self.received.values().sum()
    }
}

/// Progress of a chunked upload after accepting a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub received: u32,
    pub total: u32,
}

impl ChunkProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.received == self.total
    }
}

/// Collects the chunks of client-driven multi-part uploads.
///
/// Chunks may arrive in any order and are kept on disk under
/// `<dir>/<upload_id>/<index>` until [`complete`](Self::complete) joins them
/// into a [`PendingUpload`]. Abandoned uploads expire with the TTL.
pub struct ChunkAssembler {
    dir: PathBuf,
    ttl: Duration,
    max_bytes: Option<u64>,
    cache: Cache<String, Arc<Mutex<ChunkState>>>,
}

fn validate_upload_id(upload_id: &str) -> Result<(), StagingError> {
    let valid = !upload_id.is_empty()
        && upload_id.len() <= 128
        && upload_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StagingError::InvalidUploadId(upload_id.to_owned()))
    }
}

/// Concatenate chunks `0..total` of `chunk_dir` into `target`. Returns the
/// number of bytes written.
async fn assemble(chunk_dir: &Path, total: u32, target: &Path) -> std::io::Result<u64> {
    let mut out = tokio::fs::File::create(target).await?;
    let mut written = 0u64;
    for index in 0..total {
        let chunk = tokio::fs::read(chunk_dir.join(index.to_string())).await?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;
    Ok(written)
}

impl ChunkAssembler {
    pub async fn open(
        dir: impl Into<PathBuf>,
        ttl: Duration,
        max_capacity: u64,
    ) -> Result<Self, StagingError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let root = dir.clone();
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .eviction_listener(move |upload_id: Arc<String>, _state, cause| {
                if cause.was_evicted() {
                    debug!(upload_id = %upload_id, ?cause, "abandoned chunked upload evicted");
                    let _ = std::fs::remove_dir_all(root.join(upload_id.as_str()));
                }
            })
            .build();
        Ok(Self {
            dir,
            ttl,
            max_bytes: None,
            cache,
        })
    }

    /// Reject a chunk once the upload it belongs to would exceed `limit`
    /// bytes.
    #[must_use]
    pub fn with_max_bytes(mut self, limit: u64) -> Self {
        self.max_bytes = Some(limit);
        self
    }

    /// Store one chunk. `index` is zero-based.
    pub async fn add_chunk(
        &self,
        upload_id: &str,
        index: u32,
        total: u32,
        file_name: &str,
        data: Bytes,
    ) -> Result<ChunkProgress, StagingError> {
        validate_upload_id(upload_id)?;
        let invalid = |reason: String| StagingError::InvalidChunk {
            upload_id: upload_id.to_owned(),
            reason,
        };
        if total == 0 {
            return Err(invalid("totalChunks must be at least 1".to_owned()));
        }
        if index >= total {
            return Err(invalid(format!("chunk index {index} out of range for {total} chunks")));
        }

        let state = self
            .cache
            .get_with(upload_id.to_owned(), async {
                Arc::new(Mutex::new(ChunkState {
                    file_name: file_name.to_owned(),
                    total,
                    received: BTreeMap::new(),
                }))
            })
            .await;
        let size = data.len() as u64;
        {
            let s = state.lock();
            if s.total != total {
                return Err(invalid(format!(
                    "totalChunks changed from {} to {total}",
                    s.total
                )));
            }
            // A resent chunk replaces the earlier one.
            let replaced = s.received.get(&index).copied().unwrap_or(0);
            let running = s.bytes() - replaced + size;
            match self.max_bytes {
                Some(limit) if running > limit => {
                    return Err(StagingError::TooLarge {
                        size: running,
                        limit,
                    });
                }
                _ => {}
            }
        }

        let chunk_dir = self.dir.join(upload_id);
        tokio::fs::create_dir_all(&chunk_dir).await?;
        tokio::fs::write(chunk_dir.join(index.to_string()), &data).await?;

        let mut s = state.lock();
        s.received.insert(index, size);
        let progress = ChunkProgress {
            received: u32::try_from(s.received.len()).unwrap_or(u32::MAX),
            total: s.total,
        };
        debug!(upload_id, index, received = progress.received, total, "chunk stored");
        Ok(progress)
    }

    /// Join every chunk of `upload_id` into a pending upload in `uploads`.
    pub async fn complete(
        &self,
        upload_id: &str,
        uploads: &UploadStore,
    ) -> Result<PendingUpload, StagingError> {
        validate_upload_id(upload_id)?;
        let state = self
            .cache
            .get(upload_id)
            .await
            .ok_or_else(|| StagingError::UploadNotFound(upload_id.to_owned()))?;
        let (file_name, total, bytes) = {
            let s = state.lock();
            let received = u32::try_from(s.received.len()).unwrap_or(u32::MAX);
            if received != s.total {
                return Err(StagingError::Incomplete {
                    upload_id: upload_id.to_owned(),
                    received,
                    total: s.total,
                });
            }
            (s.file_name.clone(), s.total, s.bytes())
        };
        uploads.check_size(bytes)?;

        let chunk_dir = self.dir.join(upload_id);
        let file_id = uuid::Uuid::new_v4().simple().to_string();
        let target = uploads.path_for(&file_id, &file_name);
        let bytes = match assemble(&chunk_dir, total, &target).await {
            Ok(written) => written,
            Err(e) => {
                remove_quietly(&target);
                return Err(e.into());
            }
        };
        if let Err(e) = uploads.check_size(bytes) {
            remove_quietly(&target);
            return Err(e);
        }

        self.cache.invalidate(upload_id).await;
        let _ = tokio::fs::remove_dir_all(&chunk_dir).await;
        info!(upload_id, file_id = %file_id, chunks = total, size = bytes, "chunked upload assembled");
        Ok(uploads.register(file_id, &file_name, target, bytes).await)
    }

    /// Current progress of an upload, if it is known.
    pub async fn progress(&self, upload_id: &str) -> Option<ChunkProgress> {
        let state = self.cache.get(upload_id).await?;
        let s = state.lock();
        Some(ChunkProgress {
            received: u32::try_from(s.received.len()).unwrap_or(u32::MAX),
            total: s.total,
        })
    }
}

impl std::fmt::Debug for ChunkAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkAssembler")
            .field("dir", &self.dir)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Sweepable for ChunkAssembler {
    fn name(&self) -> &'static str {
        "chunks"
    }

    async fn sweep(&self) -> Result<usize, StagingError> {
        self.cache.run_pending_tasks().await;
        let live: HashSet<PathBuf> = self
            .cache
            .iter()
            .map(|(id, _)| self.dir.join(id.as_str()))
            .collect();
        Ok(remove_stale_files(&self.dir, &live, self.ttl).await?)
    }
}

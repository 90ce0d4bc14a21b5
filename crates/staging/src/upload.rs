use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::StagingError;
use crate::files::{content_type_for, remove_quietly, remove_stale_files, sanitize_file_name};
use crate::sweeper::Sweepable;

/// A file received over HTTP and waiting for a store action to consume it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpload {
    pub file_id: String,
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub content_type: String,
    pub size: u64,
    pub expires_at: DateTime<Utc>,
}

/// TTL-scoped registry of pending uploads backed by files in one directory.
///
/// Entries that expire or are pushed out by capacity have their file deleted.
/// Explicit [`remove`](Self::remove) deletes the file too.
pub struct UploadStore {
    dir: PathBuf,
    ttl: Duration,
    max_bytes: Option<u64>,
    cache: Cache<String, PendingUpload>,
}

impl UploadStore {
    /// Open (creating if needed) the upload directory.
    pub async fn open(
        dir: impl Into<PathBuf>,
        ttl: Duration,
        max_capacity: u64,
    ) -> Result<Self, StagingError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .eviction_listener(|file_id: std::sync::Arc<String>, upload: PendingUpload, cause| {
                if cause.was_evicted() {
                    debug!(file_id = %file_id, ?cause, "pending upload evicted");
                    remove_quietly(&upload.path);
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

    /// Reject uploads larger than `limit` bytes.
    #[must_use]
    pub fn with_max_bytes(mut self, limit: u64) -> Self {
        self.max_bytes = Some(limit);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn check_size(&self, size: u64) -> Result<(), StagingError> {
        match self.max_bytes {
            Some(limit) if size > limit => Err(StagingError::TooLarge { size, limit }),
            _ => Ok(()),
        }
    }

    /// Write `data` to disk and register it under a fresh file id.
    pub async fn put(&self, file_name: &str, data: Bytes) -> Result<PendingUpload, StagingError> {
        self.check_size(data.len() as u64)?;
        let file_id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.path_for(&file_id, file_name);
        tokio::fs::write(&path, &data).await?;
        Ok(self.register(file_id, file_name, path, data.len() as u64).await)
    }

    /// Register a file already written to [`dir`](Self::dir).
    pub(crate) async fn register(
        &self,
        file_id: String,
        file_name: &str,
        path: PathBuf,
        size: u64,
    ) -> PendingUpload {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let upload = PendingUpload {
            file_id: file_id.clone(),
            file_name: file_name.to_owned(),
            path,
            content_type: content_type_for(file_name).to_owned(),
            size,
            expires_at,
        };
        self.cache.insert(file_id, upload.clone()).await;
        info!(file_id = %upload.file_id, file_name = %upload.file_name, size, "upload staged");
        upload
    }

    pub(crate) fn path_for(&self, file_id: &str, file_name: &str) -> PathBuf {
        self.dir
            .join(format!("{file_id}_{}", sanitize_file_name(file_name)))
    }

    /// Look up a pending upload without consuming it.
    pub async fn get(&self, file_id: &str) -> Option<PendingUpload> {
        self.cache.get(file_id).await
    }

    /// Read the bytes of a pending upload without consuming it.
    pub async fn read(&self, file_id: &str) -> Result<(PendingUpload, Bytes), StagingError> {
        let upload = self
            .get(file_id)
            .await
            .ok_or_else(|| StagingError::UploadNotFound(file_id.to_owned()))?;
        let data = match tokio::fs::read(&upload.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.cache.invalidate(file_id).await;
                return Err(StagingError::UploadNotFound(file_id.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok((upload, Bytes::from(data)))
    }

    /// Drop a pending upload and delete its file. Returns whether it existed.
    pub async fn remove(&self, file_id: &str) -> bool {
        match self.cache.remove(file_id).await {
            Some(upload) => {
                remove_quietly(&upload.path);
                info!(file_id, "pending upload removed");
                true
            }
            None => false,
        }
    }

    /// Approximate number of live entries.
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for UploadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadStore")
            .field("dir", &self.dir)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Sweepable for UploadStore {
    fn name(&self) -> &'static str {
        "uploads"
    }

    async fn sweep(&self) -> Result<usize, StagingError> {
        self.cache.run_pending_tasks().await;
        let live: HashSet<PathBuf> = self.cache.iter().map(|(_, u)| u.path).collect();
        Ok(remove_stale_files(&self.dir, &live, self.ttl).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(dir: &Path) -> UploadStore {
        UploadStore::open(dir, Duration::from_secs(3600), 100)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn put_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = store(dir.path()).await;

        let upload = uploads
            .put("notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(upload.content_type, "text/plain");
        assert_eq!(upload.size, 5);
        assert!(upload.path.starts_with(dir.path()));

        let (found, data) = uploads.read(&upload.file_id).await.unwrap();
        assert_eq!(found.file_name, "notes.txt");
        assert_eq!(&data[..], b"hello");
    }

    #[tokio::test]
    async fn remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = store(dir.path()).await;
        let upload = uploads.put("a.bin", Bytes::from_static(b"x")).await.unwrap();

        assert!(uploads.remove(&upload.file_id).await);
        assert!(!upload.path.exists());
        assert!(!uploads.remove(&upload.file_id).await);
        assert!(matches!(
            uploads.read(&upload.file_id).await,
            Err(StagingError::UploadNotFound(_))
        ));
    }

    #[tokio::test]
    async fn size_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = store(dir.path()).await.with_max_bytes(4);
        let err = uploads
            .put("big.bin", Bytes::from_static(b"12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::TooLarge { size: 5, limit: 4 }));
    }

    #[tokio::test]
    async fn expired_upload_is_gone_and_swept() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadStore::open(dir.path(), Duration::from_millis(50), 100)
            .await
            .unwrap();
        let upload = uploads.put("a.txt", Bytes::from_static(b"x")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(uploads.get(&upload.file_id).await.is_none());

        uploads.sweep().await.unwrap();
        assert!(!upload.path.exists());
    }

    #[tokio::test]
    async fn sweep_removes_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadStore::open(dir.path(), Duration::from_millis(1), 100)
            .await
            .unwrap();
        let orphan = dir.path().join("leftover_from_crash.bin");
        std::fs::write(&orphan, b"z").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let removed = uploads.sweep().await.unwrap();
        assert_eq!(removed, 1);
        assert!(!orphan.exists());
    }
}

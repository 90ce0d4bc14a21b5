use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use harbor_core::DownloadTicket;
use moka::future::Cache;
use tracing::{debug, info, warn};

use crate::error::StagingError;
use crate::files::{content_type_for, remove_quietly, remove_stale_files, sanitize_file_name};
use crate::sweeper::Sweepable;

/// How long an expired token lingers so that redeeming it reports
/// [`StagingError::TokenExpired`] rather than [`StagingError::TokenNotFound`].
const EXPIRED_GRACE: Duration = Duration::from_secs(300);

/// A redeemed download.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Stages decrypted files behind short-lived, single-use tokens.
#[async_trait]
pub trait DownloadStore: Send + Sync + std::fmt::Debug {
    /// Persist `data` and mint a token for it.
    async fn stage(&self, file_name: &str, data: Bytes) -> Result<DownloadTicket, StagingError>;

    /// Consume a token, returning the file. A token can be redeemed once.
    async fn redeem(&self, token: &str) -> Result<DownloadedFile, StagingError>;
}

#[derive(Debug, Clone)]
struct StagedDownload {
    path: PathBuf,
    file_name: String,
    content_type: String,
    expires_at: DateTime<Utc>,
}

/// [`DownloadStore`] keeping files in a directory, named `<token>_<file name>`.
pub struct DiskDownloadStore {
    dir: PathBuf,
    base_url: String,
    ttl: Duration,
    cache: Cache<String, StagedDownload>,
}

impl DiskDownloadStore {
    /// `base_url` is the externally reachable server origin used in links.
    pub async fn open(
        dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
        ttl: Duration,
        max_capacity: u64,
    ) -> Result<Self, StagingError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl + EXPIRED_GRACE)
            .eviction_listener(|token: Arc<String>, staged: StagedDownload, cause| {
                if cause.was_evicted() {
                    debug!(token = %token, ?cause, "staged download evicted");
                    remove_quietly(&staged.path);
                }
            })
            .build();
        Ok(Self {
            dir,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            ttl,
            cache,
        })
    }

    fn url_for(&self, token: &str) -> String {
        format!("{}/api/download?token={token}", self.base_url)
    }
}

impl std::fmt::Debug for DiskDownloadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskDownloadStore")
            .field("dir", &self.dir)
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DownloadStore for DiskDownloadStore {
    async fn stage(&self, file_name: &str, data: Bytes) -> Result<DownloadTicket, StagingError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let path = self
            .dir
            .join(format!("{token}_{}", sanitize_file_name(file_name)));
        tokio::fs::write(&path, &data).await?;

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        let content_type = content_type_for(file_name).to_owned();
        self.cache
            .insert(
                token.clone(),
                StagedDownload {
                    path,
                    file_name: file_name.to_owned(),
                    content_type: content_type.clone(),
                    expires_at,
                },
            )
            .await;
        info!(file_name, size = data.len(), %expires_at, "download staged");

        Ok(DownloadTicket {
            url: self.url_for(&token),
            token,
            file_name: file_name.to_owned(),
            content_type,
            size: data.len() as u64,
            expires_at,
        })
    }

    async fn redeem(&self, token: &str) -> Result<DownloadedFile, StagingError> {
        let staged = self
            .cache
            .remove(token)
            .await
            .ok_or(StagingError::TokenNotFound)?;
        if staged.expires_at <= Utc::now() {
            remove_quietly(&staged.path);
            warn!(file_name = %staged.file_name, "expired download token presented");
            return Err(StagingError::TokenExpired);
        }
        let data = match tokio::fs::read(&staged.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StagingError::TokenNotFound);
            }
            Err(e) => return Err(e.into()),
        };
        remove_quietly(&staged.path);
        info!(file_name = %staged.file_name, size = data.len(), "download redeemed");
        Ok(DownloadedFile {
            file_name: staged.file_name,
            content_type: staged.content_type,
            data: Bytes::from(data),
        })
    }
}

#[async_trait]
impl Sweepable for DiskDownloadStore {
    fn name(&self) -> &'static str {
        "downloads"
    }

    async fn sweep(&self) -> Result<usize, StagingError> {
        self.cache.run_pending_tasks().await;
        let now = Utc::now();
        let mut live = HashSet::new();
        let entries: Vec<_> = self.cache.iter().collect();
        for (token, staged) in entries {
            if staged.expires_at <= now {
                self.cache.invalidate(token.as_str()).await;
                remove_quietly(&staged.path);
            } else {
                live.insert(staged.path);
            }
        }
        Ok(remove_stale_files(&self.dir, &live, self.ttl).await?)
    }
}

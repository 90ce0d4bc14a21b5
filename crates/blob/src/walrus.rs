use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use harbor_core::{BlobId, RetentionParams};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::BlobError;
use crate::store::BlobStore;
use crate::types::BlobRecord;

/// Connection settings for a Walrus publisher / aggregator pair.
#[derive(Debug, Clone)]
pub struct WalrusConfig {
    /// Base URL of the publisher that accepts writes.
    pub publisher_url: String,
    /// Base URL of the aggregator that serves reads.
    pub aggregator_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl WalrusConfig {
    pub fn new(publisher_url: impl Into<String>, aggregator_url: impl Into<String>) -> Self {
        Self {
            publisher_url: publisher_url.into(),
            aggregator_url: aggregator_url.into(),
            timeout_seconds: 60,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// [`BlobStore`] talking to the Walrus HTTP publisher and aggregator APIs.
#[derive(Debug)]
pub struct WalrusHttpStore {
    client: reqwest::Client,
    config: WalrusConfig,
}

impl WalrusHttpStore {
    pub fn new(config: WalrusConfig) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BlobError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn store_url(&self, retention: RetentionParams) -> String {
        let base = self.config.publisher_url.trim_end_matches('/');
        let lifetime = if retention.deletable {
            "deletable=true"
        } else {
            "permanent=true"
        };
        format!("{base}/v1/blobs?epochs={}&{lifetime}", retention.epochs)
    }

    fn read_url(&self, id: &BlobId) -> String {
        let base = self.config.aggregator_url.trim_end_matches('/');
        format!("{base}/v1/blobs/{id}")
    }

    fn map_transport(&self, e: &reqwest::Error) -> BlobError {
        if e.is_timeout() {
            BlobError::Http(format!(
                "request timed out after {}s",
                self.config.timeout_seconds
            ))
        } else {
            BlobError::Http(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
enum StoreResponse {
    NewlyCreated { blob_object: BlobObject },
    AlreadyCertified { blob_id: String, end_epoch: u64 },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobObject {
    blob_id: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    deletable: Option<bool>,
    storage: StorageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageInfo {
    end_epoch: u64,
}

/// Turn a publisher response body into a [`BlobRecord`].
fn parse_store_response(
    body: &[u8],
    retention: RetentionParams,
    size: u64,
) -> Result<BlobRecord, BlobError> {
    let response: StoreResponse = serde_json::from_slice(body)
        .map_err(|e| BlobError::InvalidResponse(format!("publisher response: {e}")))?;
    Ok(match response {
        StoreResponse::NewlyCreated { blob_object } => BlobRecord {
            blob_id: BlobId::new(blob_object.blob_id),
            end_epoch: blob_object.storage.end_epoch,
            deletable: blob_object.deletable.unwrap_or(retention.deletable),
            size: blob_object.size.unwrap_or(size),
            already_certified: false,
        },
        StoreResponse::AlreadyCertified { blob_id, end_epoch } => BlobRecord {
            blob_id: BlobId::new(blob_id),
            end_epoch,
            deletable: retention.deletable,
            size,
            already_certified: true,
        },
    })
}

#[async_trait]
impl BlobStore for WalrusHttpStore {
    async fn write_blob(
        &self,
        data: Bytes,
        retention: RetentionParams,
    ) -> Result<BlobRecord, BlobError> {
        retention.validate().map_err(BlobError::InvalidRetention)?;

        let url = self.store_url(retention);
        let size = data.len() as u64;
        debug!(url = %url, size, "writing blob to publisher");

        let response = self
            .client
            .put(&url)
            .body(data)
            .send()
            .await
            .map_err(|e| self.map_transport(&e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport(&e))?;
        if !status.is_success() {
            warn!(status = %status, "publisher rejected blob");
            return Err(BlobError::Storage(format!(
                "HTTP {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        let record = parse_store_response(&body, retention, size)?;
        info!(
            blob_id = %record.blob_id,
            end_epoch = record.end_epoch,
            already_certified = record.already_certified,
            "blob stored"
        );
        Ok(record)
    }

    async fn read_blob(&self, id: &BlobId) -> Result<Bytes, BlobError> {
        let response = self
            .client
            .get(self.read_url(id))
            .send()
            .await
            .map_err(|e| self.map_transport(&e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BlobError::NotFound(id.to_string())),
            status if status.is_success() => {
                response.bytes().await.map_err(|e| self.map_transport(&e))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(BlobError::Storage(format!("HTTP {status}: {body}")))
            }
        }
    }

    async fn delete_blob(&self, _id: &BlobId) -> Result<(), BlobError> {
        // Deletion needs the owning wallet; the HTTP publisher does not expose it.
        Err(BlobError::Unsupported("delete via HTTP publisher"))
    }
}

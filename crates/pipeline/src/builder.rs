use std::sync::Arc;

use dashmap::DashMap;
use harbor_blob::BlobStore;
use harbor_ledger::{AccessControlTx, AgentSigner, LedgerClient, PackageIds};
use harbor_seal::{DEFAULT_SESSION_TTL_MINUTES, ThresholdEncryptor};
use harbor_staging::DownloadStore;

use crate::error::PipelineError;
use crate::memory_store::MemoryStore;
use crate::metrics::PipelineMetrics;
use crate::pipeline::Pipeline;

/// Default number of key servers that must approve a decryption.
pub const DEFAULT_THRESHOLD: u8 = 2;

/// Fluent builder for a [`Pipeline`].
///
/// The ledger, blob store, encryptor, signer, memory store and download
/// store are required. Packages default to [`PackageIds::default`], the
/// threshold to 2 and sessions to 10 minutes.
#[derive(Default)]
pub struct PipelineBuilder {
    ledger: Option<Arc<dyn LedgerClient>>,
    blobs: Option<Arc<dyn BlobStore>>,
    encryptor: Option<Arc<dyn ThresholdEncryptor>>,
    signer: Option<Arc<AgentSigner>>,
    memories: Option<Arc<dyn MemoryStore>>,
    downloads: Option<Arc<dyn DownloadStore>>,
    packages: Option<PackageIds>,
    threshold: Option<u8>,
    session_ttl_minutes: Option<u32>,
    serialize_mint_store: bool,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ledger(mut self, ledger: Arc<dyn LedgerClient>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    #[must_use]
    pub fn blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    #[must_use]
    pub fn encryptor(mut self, encryptor: Arc<dyn ThresholdEncryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// The operating keypair: owns created objects and signs sessions.
    #[must_use]
    pub fn signer(mut self, signer: Arc<AgentSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    #[must_use]
    pub fn memory_store(mut self, memories: Arc<dyn MemoryStore>) -> Self {
        self.memories = Some(memories);
        self
    }

    #[must_use]
    pub fn download_store(mut self, downloads: Arc<dyn DownloadStore>) -> Self {
        self.downloads = Some(downloads);
        self
    }

    #[must_use]
    pub fn packages(mut self, packages: PackageIds) -> Self {
        self.packages = Some(packages);
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn session_ttl_minutes(mut self, minutes: u32) -> Self {
        self.session_ttl_minutes = Some(minutes);
        self
    }

    /// Hold a per-address lock across the four mint-gated store steps so
    /// concurrent calls cannot interleave their collections.
    #[must_use]
    pub fn serialize_mint_store(mut self, enabled: bool) -> Self {
        self.serialize_mint_store = enabled;
        self
    }

    /// Share a metrics instance (e.g. with the HTTP layer).
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consume the builder and produce a configured [`Pipeline`].
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let missing = |what: &str| PipelineError::Configuration(format!("{what} is required"));
        let threshold = self.threshold.unwrap_or(DEFAULT_THRESHOLD);
        if threshold == 0 {
            return Err(PipelineError::Configuration(
                "threshold must be at least 1".into(),
            ));
        }
        let session_ttl_minutes = self
            .session_ttl_minutes
            .unwrap_or(DEFAULT_SESSION_TTL_MINUTES);
        if session_ttl_minutes == 0 {
            return Err(PipelineError::Configuration(
                "session TTL must be at least one minute".into(),
            ));
        }

        Ok(Pipeline {
            ledger: self.ledger.ok_or_else(|| missing("ledger client"))?,
            blobs: self.blobs.ok_or_else(|| missing("blob store"))?,
            encryptor: self.encryptor.ok_or_else(|| missing("encryptor"))?,
            signer: self.signer.ok_or_else(|| missing("signer"))?,
            memories: self.memories.ok_or_else(|| missing("memory store"))?,
            downloads: self.downloads.ok_or_else(|| missing("download store"))?,
            tx: AccessControlTx::new(self.packages.unwrap_or_default()),
            threshold,
            session_ttl_minutes,
            mint_locks: self.serialize_mint_store.then(DashMap::new),
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}

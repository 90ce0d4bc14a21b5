//! Builds the application state and background sweeper from configuration.

use std::sync::Arc;

use harbor_blob::{BlobStore, MemoryBlobStore, WalrusConfig, WalrusHttpStore};
use harbor_intent::{HttpIntentExtractor, IntentExtractor};
use harbor_ledger::{AgentSigner, LedgerClient, MemoryLedger};
use harbor_pipeline::{InMemoryMemoryStore, PipelineBuilder};
use harbor_seal::LocalKeyServerCommittee;
use harbor_staging::{ChunkAssembler, DiskDownloadStore, DownloadStore, Sweeper, UploadStore};
use rand_core::{OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::AppState;
use crate::chat::ChatAdapter;
use crate::config::{HarborConfig, SIGNER_KEY_ENV};
use crate::error::ServerError;

/// Everything `main` needs to serve: the router state and the sweeper
/// with its shutdown handle.
pub struct App {
    pub state: AppState,
    pub sweeper: Sweeper,
    pub sweeper_shutdown: mpsc::Sender<()>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("address", self.state.pipeline.address())
            .field("sweeper", &self.sweeper)
            .finish_non_exhaustive()
    }
}

/// Load the operating keypair from `HARBOR_SIGNER_KEY`, the config, or a
/// freshly generated key, in that order.
pub fn create_signer(config: &HarborConfig) -> Result<AgentSigner, ServerError> {
    let from_env = std::env::var(SIGNER_KEY_ENV).ok().map(SecretString::new);
    match from_env.as_ref().or(config.ledger.signer_key.as_ref()) {
        Some(secret) => AgentSigner::from_secret_hex(secret.expose_secret())
            .map_err(|e| ServerError::Config(format!("invalid signer key: {e}"))),
        None => {
            let signer = AgentSigner::generate();
            warn!(
                address = %signer.address(),
                "no signer key configured, generated an ephemeral keypair"
            );
            Ok(signer)
        }
    }
}

/// Create the ledger client for `[ledger] backend`.
pub fn create_ledger(config: &HarborConfig) -> Result<Arc<dyn LedgerClient>, ServerError> {
    match config.ledger.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryLedger::new(config.ledger.packages()))),
        other => Err(ServerError::Config(format!(
            "unknown ledger backend: {other}"
        ))),
    }
}

/// Create the blob store for `[storage] backend`.
pub fn create_blob_store(config: &HarborConfig) -> Result<Arc<dyn BlobStore>, ServerError> {
    let storage = &config.storage;
    let store: Arc<dyn BlobStore> = match storage.backend.as_str() {
        "memory" => Arc::new(MemoryBlobStore::new()),
        "walrus" => {
            let publisher = storage.publisher_url.as_deref().ok_or_else(|| {
                ServerError::Config("walrus backend requires [storage] publisher_url".into())
            })?;
            let aggregator = storage.aggregator_url.as_deref().ok_or_else(|| {
                ServerError::Config("walrus backend requires [storage] aggregator_url".into())
            })?;
            let walrus = WalrusConfig::new(publisher, aggregator)
                .with_timeout(storage.timeout_seconds);
            Arc::new(
                WalrusHttpStore::new(walrus)
                    .map_err(|e| ServerError::Config(format!("walrus: {e}")))?,
            )
        }
        other => {
            return Err(ServerError::Config(format!(
                "unknown storage backend: {other}"
            )));
        }
    };
    info!(backend = %storage.backend, "blob store initialized");
    Ok(store)
}

fn committee_secret(config: &HarborConfig) -> SecretString {
    if let Some(secret) = &config.seal.committee_secret {
        return secret.clone();
    }
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    warn!("no committee secret configured, sealed data will not survive a restart");
    SecretString::new(hex::encode(bytes))
}

/// Wire every component described by `config`.
pub async fn build_app(config: &HarborConfig) -> Result<App, ServerError> {
    let signer = Arc::new(create_signer(config)?);
    let ledger = create_ledger(config)?;
    let blobs = create_blob_store(config)?;
    let committee = LocalKeyServerCommittee::new(
        Arc::clone(&ledger),
        &committee_secret(config),
        &config.seal.key_servers,
    )
    .map_err(|e| ServerError::Config(format!("key servers: {e}")))?;

    let staging = &config.staging;
    let max_upload = config.server.max_upload_bytes;
    let uploads = Arc::new(
        UploadStore::open(&staging.upload_dir, staging.upload_ttl(), staging.max_entries)
            .await?
            .with_max_bytes(max_upload),
    );
    let chunks = Arc::new(
        ChunkAssembler::open(&staging.chunk_dir, staging.upload_ttl(), staging.max_entries)
            .await?
            .with_max_bytes(max_upload),
    );
    let disk_downloads = Arc::new(
        DiskDownloadStore::open(
            &staging.download_dir,
            config.server.external_url(),
            staging.download_ttl(),
            staging.max_entries,
        )
        .await?,
    );
    let downloads: Arc<dyn DownloadStore> = disk_downloads.clone();

    let pipeline = Arc::new(
        PipelineBuilder::new()
            .ledger(ledger)
            .blob_store(blobs)
            .encryptor(Arc::new(committee))
            .signer(signer)
            .memory_store(Arc::new(InMemoryMemoryStore::new()))
            .download_store(Arc::clone(&downloads))
            .packages(config.ledger.packages())
            .threshold(config.seal.threshold)
            .session_ttl_minutes(config.seal.session_ttl_minutes)
            .serialize_mint_store(config.pipeline.serialize_mint_store)
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?,
    );

    let extractor: Option<Arc<dyn IntentExtractor>> = match config.intent.client_config() {
        Some(intent) => {
            info!(model = %intent.model, "intent extraction enabled");
            Some(Arc::new(HttpIntentExtractor::new(intent)?))
        }
        None => None,
    };
    let chat = Arc::new(ChatAdapter::new(
        Arc::clone(&pipeline),
        extractor,
        Arc::clone(&uploads),
        Arc::clone(&downloads),
    ));

    let (sweeper, sweeper_shutdown) = Sweeper::new(staging.sweep_interval());
    let sweeper = sweeper
        .with_target(uploads.clone())
        .with_target(chunks.clone())
        .with_target(disk_downloads);

    info!(address = %pipeline.address(), "harbor pipeline ready");
    Ok(App {
        state: AppState {
            pipeline,
            chat,
            uploads,
            chunks,
            downloads,
            default_retention: config.storage.default_retention(),
            max_upload_bytes: usize::try_from(max_upload).unwrap_or(usize::MAX),
        },
        sweeper,
        sweeper_shutdown,
    })
}

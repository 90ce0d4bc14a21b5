#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use harbor_blob::{BlobError, BlobRecord, BlobStore, MemoryBlobStore};
use harbor_core::{Address, BlobId, ObjectId, RetentionParams};
use harbor_ledger::{
    AgentSigner, LedgerClient, LedgerError, LedgerObject, MemoryLedger, PackageIds,
    SignedTransaction, TransactionEffects,
};
use harbor_pipeline::{InMemoryMemoryStore, Pipeline, PipelineBuilder};
use harbor_seal::{
    EncryptRequest, LocalKeyServerCommittee, SealError, SessionCredentials, ThresholdEncryptor,
};
use harbor_staging::DiskDownloadStore;
use secrecy::SecretString;

/// Blob store wrapper counting calls, optionally failing every write.
pub struct CountingBlobStore {
    pub inner: MemoryBlobStore,
    pub writes: AtomicUsize,
    pub reads: AtomicUsize,
    fail_writes: bool,
}

impl CountingBlobStore {
    pub fn new(fail_writes: bool) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            writes: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            fail_writes,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for CountingBlobStore {
    async fn write_blob(
        &self,
        data: Bytes,
        retention: RetentionParams,
    ) -> Result<BlobRecord, BlobError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(BlobError::Http("publisher returned 503".into()));
        }
        self.inner.write_blob(data, retention).await
    }

    async fn read_blob(&self, id: &BlobId) -> Result<Bytes, BlobError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_blob(id).await
    }

    async fn delete_blob(&self, id: &BlobId) -> Result<(), BlobError> {
        self.inner.delete_blob(id).await
    }
}

/// Encryptor whose `encrypt` always fails.
pub struct FailingEncryptor;

#[async_trait]
impl ThresholdEncryptor for FailingEncryptor {
    async fn encrypt(&self, _request: EncryptRequest) -> Result<Bytes, SealError> {
        Err(SealError::Encryption("key servers rejected the request".into()))
    }

    async fn decrypt(
        &self,
        _ciphertext: &[u8],
        _approval: &[u8],
        _session: &SessionCredentials,
    ) -> Result<Bytes, SealError> {
        Err(SealError::KeyServerUnavailable {
            approvals: 0,
            threshold: 2,
        })
    }
}

/// Ledger that commits transactions but reports no created objects.
pub struct EffectsDroppingLedger(pub Arc<MemoryLedger>);

#[async_trait]
impl LedgerClient for EffectsDroppingLedger {
    async fn execute(&self, tx: SignedTransaction) -> Result<TransactionEffects, LedgerError> {
        let mut effects = self.0.execute(tx).await?;
        effects.created.clear();
        Ok(effects)
    }

    async fn read_object(&self, id: &ObjectId) -> Result<LedgerObject, LedgerError> {
        self.0.read_object(id).await
    }

    async fn owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> Result<Vec<LedgerObject>, LedgerError> {
        self.0.owned_objects(owner, struct_type).await
    }

    async fn dev_inspect(&self, kind_bytes: &[u8], sender: &Address) -> Result<(), LedgerError> {
        self.0.dev_inspect(kind_bytes, sender).await
    }
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub ledger: Arc<MemoryLedger>,
    pub blobs: Arc<CountingBlobStore>,
    pub committee: Arc<LocalKeyServerCommittee>,
    pub memories: Arc<InMemoryMemoryStore>,
    pub downloads: Arc<DiskDownloadStore>,
    pub signer: Arc<AgentSigner>,
    _dir: tempfile::TempDir,
}

#[derive(Default)]
pub struct HarnessOptions {
    pub fail_writes: bool,
    pub fail_encrypt: bool,
    pub serialize_mint_store: bool,
    pub drop_created_effects: bool,
}

pub async fn harness() -> Harness {
    harness_with(HarnessOptions::default()).await
}

pub async fn harness_with(options: HarnessOptions) -> Harness {
    let ledger = Arc::new(MemoryLedger::new(PackageIds::default()));
    let blobs = Arc::new(CountingBlobStore::new(options.fail_writes));
    let ids: Vec<String> = ["ks-1", "ks-2", "ks-3"].map(String::from).to_vec();
    let committee = Arc::new(
        LocalKeyServerCommittee::new(
            Arc::clone(&ledger) as Arc<dyn LedgerClient>,
            &SecretString::new("test-committee-secret".into()),
            &ids,
        )
        .unwrap(),
    );
    let memories = Arc::new(InMemoryMemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let downloads = Arc::new(
        DiskDownloadStore::open(
            dir.path(),
            "http://localhost:3000",
            Duration::from_secs(3600),
            100,
        )
        .await
        .unwrap(),
    );
    let signer = Arc::new(AgentSigner::generate());

    let encryptor: Arc<dyn ThresholdEncryptor> = if options.fail_encrypt {
        Arc::new(FailingEncryptor)
    } else {
        Arc::clone(&committee) as _
    };

    let pipeline_ledger: Arc<dyn LedgerClient> = if options.drop_created_effects {
        Arc::new(EffectsDroppingLedger(Arc::clone(&ledger)))
    } else {
        Arc::clone(&ledger) as _
    };

    let pipeline = PipelineBuilder::new()
        .ledger(pipeline_ledger)
        .blob_store(Arc::clone(&blobs) as _)
        .encryptor(encryptor)
        .signer(Arc::clone(&signer))
        .memory_store(Arc::clone(&memories) as _)
        .download_store(Arc::clone(&downloads) as _)
        .serialize_mint_store(options.serialize_mint_store)
        .build()
        .unwrap();

    Harness {
        pipeline,
        ledger,
        blobs,
        committee,
        memories,
        downloads,
        signer,
        _dir: dir,
    }
}

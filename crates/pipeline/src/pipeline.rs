use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use harbor_blob::{BlobRecord, BlobStore};
use harbor_core::{
    Address, BlobId, Caller, CollectionInfo, HarborError, ObjectId, PolicyId,
    PolicyKind, ResourceType, RetentionParams, WorkflowOutcome, parse_memory_array,
};
use harbor_ledger::{
    AccessControlTx, AgentSigner, COLLECTION_TYPE, CollectionMetadata, LedgerClient,
    access_nft_from_object, collection_from_object,
};
use harbor_seal::{EncryptRequest, EncryptedObject, SessionCredentials, ThresholdEncryptor};
use harbor_staging::DownloadStore;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{blob_error, decrypt_error, encrypt_error, ledger_error, staging_error};
use crate::memory_store::MemoryStore;
use crate::metrics::PipelineMetrics;
use crate::receipts::{
    MemoryRestore, MintGatedStore, MintRetrieveReceipt, MintStoreReceipt, StoreReceipt,
};

/// Table restored memories land in when a record names none.
pub const DEFAULT_MEMORY_TABLE: &str = "messages";

/// Runs the store and retrieve workflows against injected collaborators.
///
/// Every operation is one sequential chain of awaited calls that stops at
/// the first failing step and reports it as a [`WorkflowOutcome`]. Nothing
/// is retried and no timeouts are imposed here; a hung collaborator hangs
/// the workflow.
pub struct Pipeline {
    pub(crate) ledger: Arc<dyn LedgerClient>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) encryptor: Arc<dyn ThresholdEncryptor>,
    pub(crate) signer: Arc<AgentSigner>,
    pub(crate) memories: Arc<dyn MemoryStore>,
    pub(crate) downloads: Arc<dyn DownloadStore>,
    pub(crate) tx: AccessControlTx,
    pub(crate) threshold: u8,
    pub(crate) session_ttl_minutes: u32,
    pub(crate) mint_locks: Option<DashMap<Address, Arc<Mutex<()>>>>,
    pub(crate) metrics: Arc<PipelineMetrics>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("address", self.signer.address())
            .field("packages", self.tx.packages())
            .field("threshold", &self.threshold)
            .field("serialize_mint_store", &self.mint_locks.is_some())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// The operating address that owns created objects.
    pub fn address(&self) -> &Address {
        self.signer.address()
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn transactions(&self) -> &AccessControlTx {
        &self.tx
    }

    /// Record a failure and convert to the boundary envelope.
    pub(crate) fn finish<T>(
        &self,
        operation: &'static str,
        result: Result<T, HarborError>,
    ) -> WorkflowOutcome<T> {
        if let Err(err) = &result {
            self.metrics.increment_failures();
            warn!(operation, kind = %err.kind(), error = %err, "operation failed");
        }
        result.into()
    }

    // -- shared steps ---------------------------------------------------

    /// Encrypt under `policy_id`, then write the ciphertext.
    pub(crate) async fn seal_and_write(
        &self,
        kind: PolicyKind,
        policy_id: &PolicyId,
        plaintext: Bytes,
        retention: RetentionParams,
    ) -> Result<BlobRecord, HarborError> {
        retention.validate().map_err(HarborError::InvalidRequest)?;

        let ciphertext = self
            .encryptor
            .encrypt(EncryptRequest {
                package_id: self.tx.packages().for_kind(kind).clone(),
                policy_id: policy_id.clone(),
                threshold: self.threshold,
                data: plaintext,
            })
            .await
            .map_err(encrypt_error)?;
        debug!(policy_id = %policy_id, ciphertext_len = ciphertext.len(), "sealed");

        let record = self
            .blobs
            .write_blob(ciphertext, retention)
            .await
            .map_err(blob_error)?;
        info!(blob_id = %record.blob_id, end_epoch = record.end_epoch, "ciphertext stored");
        Ok(record)
    }

    /// Check the ciphertext is sealed under `expected`, build the approval
    /// proof against `access_object` and decrypt.
    pub(crate) async fn open(
        &self,
        kind: PolicyKind,
        expected: &PolicyId,
        ciphertext: &[u8],
        access_object: &ObjectId,
    ) -> Result<Bytes, HarborError> {
        let header = EncryptedObject::parse(ciphertext).map_err(decrypt_error)?;
        let embedded = header.policy_id();
        if !embedded.same_as(expected) {
            return Err(HarborError::Authorization(format!(
                "ciphertext is sealed under policy {embedded}, not {expected}"
            )));
        }

        // Evaluated by the key servers as a proof; never submitted.
        let approval = self
            .tx
            .approve(kind, &embedded, access_object)
            .and_then(|tx| tx.to_kind_bytes())
            .map_err(ledger_error)?;
        let session = SessionCredentials::create(
            &self.signer,
            self.tx.packages().for_kind(kind),
            self.session_ttl_minutes,
            Utc::now(),
        );
        self.encryptor
            .decrypt(ciphertext, &approval, &session)
            .await
            .map_err(decrypt_error)
    }

    pub(crate) async fn read_blob(&self, blob_id: &BlobId) -> Result<Bytes, HarborError> {
        self.blobs.read_blob(blob_id).await.map_err(blob_error)
    }

    pub(crate) async fn read_collection(
        &self,
        id: &ObjectId,
    ) -> Result<CollectionInfo, HarborError> {
        let obj = self.ledger.read_object(id).await.map_err(ledger_error)?;
        collection_from_object(&obj).map_err(ledger_error)
    }

    /// Parse a decrypted memory array and insert every valid record,
    /// re-stamped with the caller's identity.
    pub(crate) async fn restore_memories(
        &self,
        plaintext: &[u8],
        caller: &Caller,
    ) -> Result<MemoryRestore, HarborError> {
        let parsed = parse_memory_array(plaintext).map_err(|e| {
            HarborError::InvalidRequest(format!("decrypted payload is not a memory array: {e}"))
        })?;
        let skipped = parsed.skipped;
        let mut inserted = 0;
        for record in parsed.records {
            let record = record.restamped(caller);
            let table = record
                .kind
                .clone()
                .unwrap_or_else(|| DEFAULT_MEMORY_TABLE.to_owned());
            self.memories.insert(&table, record).await?;
            inserted += 1;
        }
        self.metrics.add_memories_restored(inserted as u64);
        self.metrics.add_memories_skipped(skipped as u64);
        info!(inserted, skipped, agent_id = %caller.agent_id, "memories restored");
        Ok(MemoryRestore { inserted, skipped })
    }

    // -- workflows --------------------------------------------------------

    /// Encrypt `plaintext` under an existing allowlist and store it.
    pub async fn store_with_allowlist(
        &self,
        plaintext: Bytes,
        policy_id: &PolicyId,
        retention: RetentionParams,
    ) -> WorkflowOutcome<StoreReceipt> {
        let span = info_span!("store_with_allowlist", policy_id = %policy_id, size = plaintext.len());
        let result = self
            .store_allowlisted(plaintext, policy_id, retention)
            .instrument(span)
            .await;
        self.finish("store_with_allowlist", result)
    }

    pub(crate) async fn store_allowlisted(
        &self,
        plaintext: Bytes,
        policy_id: &PolicyId,
        retention: RetentionParams,
    ) -> Result<StoreReceipt, HarborError> {
        let size = plaintext.len() as u64;
        let record = self
            .seal_and_write(PolicyKind::Allowlist, policy_id, plaintext, retention)
            .await?;
        self.metrics.increment_stores();
        Ok(StoreReceipt {
            blob_id: record.blob_id,
            end_epoch: record.end_epoch,
            size,
            policy_id: policy_id.clone(),
        })
    }

    /// Read a blob and decrypt it as a member of the allowlist `policy_id`.
    pub async fn retrieve_with_allowlist(
        &self,
        blob_id: &BlobId,
        policy_id: &PolicyId,
    ) -> WorkflowOutcome<Bytes> {
        let span = info_span!("retrieve_with_allowlist", blob_id = %blob_id, policy_id = %policy_id);
        let result = self
            .retrieve_allowlisted(blob_id, policy_id)
            .instrument(span)
            .await;
        self.finish("retrieve_with_allowlist", result)
    }

    pub(crate) async fn retrieve_allowlisted(
        &self,
        blob_id: &BlobId,
        policy_id: &PolicyId,
    ) -> Result<Bytes, HarborError> {
        let ciphertext = self.read_blob(blob_id).await?;
        let allowlist = ObjectId::new(policy_id.as_str());
        let plaintext = self
            .open(PolicyKind::Allowlist, policy_id, &ciphertext, &allowlist)
            .await?;
        self.metrics.increment_retrieves();
        info!(size = plaintext.len(), "blob decrypted");
        Ok(plaintext)
    }

    /// Create a collection, seal `plaintext` to it, store the ciphertext and
    /// record the storage metadata on the collection.
    ///
    /// A failure after the collection exists leaves it on the ledger without
    /// content. It is logged and counted, not rolled back.
    pub async fn mint_gated_store(
        &self,
        plaintext: Bytes,
        request: MintGatedStore,
    ) -> WorkflowOutcome<MintStoreReceipt> {
        let span = info_span!(
            "mint_gated_store",
            name = %request.collection.name,
            resource_type = ?request.resource_type,
            size = plaintext.len()
        );
        let result = self
            .mint_store(plaintext, request)
            .instrument(span)
            .await;
        self.finish("mint_gated_store", result)
    }

    pub(crate) async fn mint_store(
        &self,
        plaintext: Bytes,
        request: MintGatedStore,
    ) -> Result<MintStoreReceipt, HarborError> {
        request
            .retention
            .validate()
            .map_err(HarborError::InvalidRequest)?;

        let _serialized = match &self.mint_locks {
            Some(locks) => {
                let lock = Arc::clone(&*locks.entry(self.address().clone()).or_default());
                Some(lock.lock_owned().await)
            }
            None => None,
        };

        // Step 1: the collection id is the policy the data is sealed under.
        let spec = &request.collection;
        let created = self
            .ledger
            .sign_and_execute(
                &self
                    .tx
                    .create_collection(&spec.name, spec.max_supply, spec.mint_price),
                &self.signer,
            )
            .await
            .map_err(ledger_error)?;
        let collection_id = match created.require_created(COLLECTION_TYPE) {
            Ok(id) => id,
            Err(err) => {
                self.metrics.increment_orphaned_collections();
                warn!(
                    digest = %created.digest,
                    error = %err,
                    "collection transaction landed without a readable collection id"
                );
                return Err(ledger_error(err));
            }
        };
        info!(collection_id = %collection_id, digest = %created.digest, "collection created");

        match self
            .provision_collection(&collection_id, plaintext, &request)
            .await
        {
            Ok(receipt) => {
                self.metrics.increment_mint_stores();
                Ok(receipt)
            }
            Err(err) => {
                self.metrics.increment_orphaned_collections();
                warn!(
                    collection_id = %collection_id,
                    error = %err,
                    "collection left without content"
                );
                Err(err)
            }
        }
    }

    /// Steps 2 to 4 of the mint-gated store.
    async fn provision_collection(
        &self,
        collection_id: &ObjectId,
        plaintext: Bytes,
        request: &MintGatedStore,
    ) -> Result<MintStoreReceipt, HarborError> {
        let file_size = plaintext.len() as u64;
        let record = self
            .seal_and_write(
                PolicyKind::MintGated,
                &PolicyId::from(collection_id),
                plaintext,
                request.retention,
            )
            .await?;

        let metadata = CollectionMetadata {
            blob_id: record.blob_id.clone(),
            file_name: request.file_name.clone(),
            file_size,
            resource_type: request.resource_type,
            end_epoch: record.end_epoch,
        };
        let effects = self
            .ledger
            .sign_and_execute(
                &self.tx.update_collection_metadata(collection_id, &metadata),
                &self.signer,
            )
            .await
            .map_err(ledger_error)?;
        info!(collection_id = %collection_id, blob_id = %record.blob_id, "collection metadata recorded");

        Ok(MintStoreReceipt {
            collection_id: collection_id.clone(),
            collection: request.collection.clone(),
            blob_id: record.blob_id,
            end_epoch: record.end_epoch,
            file_name: request.file_name.clone(),
            file_size,
            digest: effects.digest,
        })
    }

    /// Decrypt the content behind an access NFT held by the operating
    /// address. Memory payloads are re-inserted for `caller`; files are
    /// staged behind a single-use download token.
    pub async fn mint_gated_retrieve(
        &self,
        nft_id: &ObjectId,
        caller: &Caller,
    ) -> WorkflowOutcome<MintRetrieveReceipt> {
        let span = info_span!("mint_gated_retrieve", nft_id = %nft_id, agent_id = %caller.agent_id);
        let result = self.mint_retrieve(nft_id, caller).instrument(span).await;
        self.finish("mint_gated_retrieve", result)
    }

    async fn mint_retrieve(
        &self,
        nft_id: &ObjectId,
        caller: &Caller,
    ) -> Result<MintRetrieveReceipt, HarborError> {
        // Step 1: NFT, then the collection it belongs to. Reads only.
        let nft_obj = self.ledger.read_object(nft_id).await.map_err(ledger_error)?;
        let nft = access_nft_from_object(&nft_obj).map_err(ledger_error)?;
        if &nft.owner != self.address() {
            return Err(HarborError::Authorization(format!(
                "NFT {nft_id} is not owned by {}",
                self.address()
            )));
        }
        let collection = self.read_collection(&nft.collection_id).await?;
        let (Some(blob_id), Some(resource_type)) =
            (collection.blob_id.clone(), collection.resource_type)
        else {
            return Err(HarborError::NotFound(format!(
                "collection {} has no stored content",
                collection.id
            )));
        };

        // Steps 2 to 4.
        let ciphertext = self.read_blob(&blob_id).await?;
        let plaintext = self
            .open(
                PolicyKind::MintGated,
                &PolicyId::from(&collection.id),
                &ciphertext,
                nft_id,
            )
            .await?;
        info!(blob_id = %blob_id, size = plaintext.len(), "collection content decrypted");

        // Step 5.
        let receipt = match resource_type {
            ResourceType::Memory => {
                MintRetrieveReceipt::Memory(self.restore_memories(&plaintext, caller).await?)
            }
            ResourceType::File => {
                let file_name = collection
                    .file_name
                    .clone()
                    .unwrap_or_else(|| format!("{blob_id}.bin"));
                let ticket = self
                    .downloads
                    .stage(&file_name, plaintext)
                    .await
                    .map_err(staging_error)?;
                self.metrics.increment_downloads_staged();
                MintRetrieveReceipt::File(ticket)
            }
        };
        self.metrics.increment_mint_retrieves();
        Ok(receipt)
    }
}

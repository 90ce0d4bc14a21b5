//! Ledger actions and plain reads outside the four sealed workflows.

use bytes::Bytes;
use harbor_core::{Address, BlobId, CollectionInfo, DownloadTicket, HarborError, ObjectId, WorkflowOutcome};
use harbor_ledger::{
    ACCESS_NFT_TYPE, ALLOWLIST_TYPE, CAP_TYPE, COLLECTION_TYPE, TransactionEffects, Transaction,
    access_nft_from_object, collection_from_object,
};
use tracing::{Instrument, info, info_span};

use crate::error::{ledger_error, staging_error};
use crate::pipeline::Pipeline;
use crate::receipts::{
    AllowlistReceipt, CollectionList, CollectionReceipt, CollectionSpec, MintReceipt, NftList,
    TxReceipt,
};

impl Pipeline {
    async fn submit(&self, tx: &Transaction) -> Result<TransactionEffects, HarborError> {
        let effects = self
            .ledger
            .sign_and_execute(tx, &self.signer)
            .await
            .map_err(ledger_error)?;
        self.metrics.increment_ledger_actions();
        Ok(effects)
    }

    /// Create an allowlist and add the operating address as its first
    /// member. Two transactions; the list survives if the second fails.
    pub async fn create_allowlist(&self, name: &str) -> WorkflowOutcome<AllowlistReceipt> {
        let result = async {
            let effects = self.submit(&self.tx.create_allowlist(name)).await?;
            let allowlist_id = effects.require_created(ALLOWLIST_TYPE).map_err(ledger_error)?;
            let cap_id = effects.require_created(CAP_TYPE).map_err(ledger_error)?;
            info!(allowlist_id = %allowlist_id, cap_id = %cap_id, "allowlist created");

            self.submit(&self.tx.add_member(&allowlist_id, &cap_id, self.address()))
                .await?;
            Ok::<_, HarborError>(AllowlistReceipt {
                allowlist_id,
                cap_id,
                digest: effects.digest,
            })
        }
        .instrument(info_span!("create_allowlist", name))
        .await;
        self.finish("create_allowlist", result)
    }

    pub async fn add_allowlist_member(
        &self,
        allowlist_id: &ObjectId,
        cap_id: &ObjectId,
        member: &Address,
    ) -> WorkflowOutcome<TxReceipt> {
        let result = async {
            let effects = self
                .submit(&self.tx.add_member(allowlist_id, cap_id, member))
                .await?;
            info!(member = %member, "allowlist member added");
            Ok::<_, HarborError>(TxReceipt {
                digest: effects.digest,
            })
        }
        .instrument(info_span!("add_allowlist_member", allowlist_id = %allowlist_id))
        .await;
        self.finish("add_allowlist_member", result)
    }

    /// Create an empty collection. Metadata can only be attached by the
    /// mint-gated store workflow.
    pub async fn create_collection(
        &self,
        spec: &CollectionSpec,
    ) -> WorkflowOutcome<CollectionReceipt> {
        let result = async {
            let effects = self
                .submit(
                    &self
                        .tx
                        .create_collection(&spec.name, spec.max_supply, spec.mint_price),
                )
                .await?;
            let collection_id = effects
                .require_created(COLLECTION_TYPE)
                .map_err(ledger_error)?;
            info!(collection_id = %collection_id, "collection created");
            Ok::<_, HarborError>(CollectionReceipt {
                collection_id,
                digest: effects.digest,
            })
        }
        .instrument(info_span!("create_collection", name = %spec.name))
        .await;
        self.finish("create_collection", result)
    }

    /// Mint an access NFT to the operating address, paying `payment` base
    /// units or the collection's price when `None`.
    pub async fn mint_access_nft(
        &self,
        collection_id: &ObjectId,
        payment: Option<u64>,
    ) -> WorkflowOutcome<MintReceipt> {
        let result = async {
            let paid = match payment {
                Some(amount) => amount,
                None => self.read_collection(collection_id).await?.mint_price,
            };
            let effects = self
                .submit(&self.tx.mint_access_nft(collection_id, paid))
                .await?;
            let nft_id = effects
                .require_created(ACCESS_NFT_TYPE)
                .map_err(ledger_error)?;
            info!(nft_id = %nft_id, paid, "access NFT minted");
            Ok::<_, HarborError>(MintReceipt {
                nft_id,
                collection_id: collection_id.clone(),
                paid,
                digest: effects.digest,
            })
        }
        .instrument(info_span!("mint_access_nft", collection_id = %collection_id))
        .await;
        self.finish("mint_access_nft", result)
    }

    /// Access NFTs held by the operating address.
    pub async fn list_my_nfts(&self) -> WorkflowOutcome<NftList> {
        let result = async {
            let objects = self
                .ledger
                .owned_objects(self.address(), ACCESS_NFT_TYPE)
                .await
                .map_err(ledger_error)?;
            let nfts = objects
                .iter()
                .map(access_nft_from_object)
                .collect::<Result<Vec<_>, _>>()
                .map_err(ledger_error)?;
            Ok::<_, HarborError>(NftList { nfts })
        }
        .await;
        self.finish("list_my_nfts", result)
    }

    /// Collections owned by the operating address.
    pub async fn list_my_collections(&self) -> WorkflowOutcome<CollectionList> {
        let result = async {
            let objects = self
                .ledger
                .owned_objects(self.address(), COLLECTION_TYPE)
                .await
                .map_err(ledger_error)?;
            let collections = objects
                .iter()
                .map(collection_from_object)
                .collect::<Result<Vec<_>, _>>()
                .map_err(ledger_error)?;
            Ok::<_, HarborError>(CollectionList { collections })
        }
        .await;
        self.finish("list_my_collections", result)
    }

    pub async fn collection_info(&self, id: &ObjectId) -> WorkflowOutcome<CollectionInfo> {
        let result = self.read_collection(id).await;
        self.finish("collection_info", result)
    }

    /// Read a blob as stored, without decrypting, and stage it for download.
    pub async fn download_blob(
        &self,
        blob_id: &BlobId,
        file_name: &str,
    ) -> WorkflowOutcome<DownloadTicket> {
        let result = async {
            let data: Bytes = self.read_blob(blob_id).await?;
            let ticket = self
                .downloads
                .stage(file_name, data)
                .await
                .map_err(staging_error)?;
            self.metrics.increment_downloads_staged();
            Ok::<_, HarborError>(ticket)
        }
        .instrument(info_span!("download_blob", blob_id = %blob_id))
        .await;
        self.finish("download_blob", result)
    }
}

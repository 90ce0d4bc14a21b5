//! Export and restore of the agent's conversation memories.

use bytes::Bytes;
use harbor_core::{BlobId, Caller, HarborError, PolicyId, ResourceType, WorkflowOutcome};
use tracing::{Instrument, info, info_span};

use crate::memory_store::MemoryQuery;
use crate::pipeline::Pipeline;
use crate::receipts::{MemoryRestore, MemoryStoreReceipt, MemoryTarget, MintGatedStore};

impl Pipeline {
    /// Serialise the caller's memories from `table` as a JSON array and
    /// seal them under `target`.
    ///
    /// Memories are selected by the caller's room, or by agent when the
    /// caller has no room.
    pub async fn store_memories(
        &self,
        caller: &Caller,
        table: &str,
        target: MemoryTarget,
    ) -> WorkflowOutcome<MemoryStoreReceipt> {
        let span = info_span!("store_memories", agent_id = %caller.agent_id, table);
        let result = self.export_memories(caller, table, target).instrument(span).await;
        self.finish("store_memories", result)
    }

    async fn export_memories(
        &self,
        caller: &Caller,
        table: &str,
        target: MemoryTarget,
    ) -> Result<MemoryStoreReceipt, HarborError> {
        let records = self
            .memories
            .load(&MemoryQuery {
                table: table.to_owned(),
                room_id: caller.room_id.clone(),
                agent_id: caller.agent_id.clone(),
            })
            .await?;
        if records.is_empty() {
            return Err(HarborError::InvalidRequest(format!(
                "no memories found in table {table}"
            )));
        }
        let record_count = records.len();
        let payload = serde_json::to_vec_pretty(&records)
            .map_err(|e| HarborError::InvalidRequest(format!("memories not serialisable: {e}")))?;
        info!(record_count, bytes = payload.len(), "memories exported");

        match target {
            MemoryTarget::Allowlist {
                policy_id,
                retention,
            } => {
                let receipt = self
                    .store_allowlisted(Bytes::from(payload), &policy_id, retention)
                    .await?;
                Ok(MemoryStoreReceipt {
                    record_count,
                    blob_id: receipt.blob_id,
                    end_epoch: receipt.end_epoch,
                    collection: None,
                })
            }
            MemoryTarget::MintGated {
                collection,
                retention,
            } => {
                let room = caller.room_id.as_deref().unwrap_or(&caller.agent_id);
                let receipt = self
                    .mint_store(
                        Bytes::from(payload),
                        MintGatedStore {
                            collection,
                            file_name: format!("memories-{room}.json"),
                            resource_type: ResourceType::Memory,
                            retention,
                        },
                    )
                    .await?;
                Ok(MemoryStoreReceipt {
                    record_count,
                    blob_id: receipt.blob_id.clone(),
                    end_epoch: receipt.end_epoch,
                    collection: Some(receipt),
                })
            }
        }
    }

    /// Allowlist retrieve followed by re-insertion of the decrypted
    /// memories, re-stamped with `caller`'s identity.
    pub async fn retrieve_memories_with_allowlist(
        &self,
        blob_id: &BlobId,
        policy_id: &PolicyId,
        caller: &Caller,
    ) -> WorkflowOutcome<MemoryRestore> {
        let span = info_span!(
            "retrieve_memories_with_allowlist",
            blob_id = %blob_id,
            agent_id = %caller.agent_id
        );
        let result = async {
            let plaintext = self.retrieve_allowlisted(blob_id, policy_id).await?;
            self.restore_memories(&plaintext, caller).await
        }
        .instrument(span)
        .await;
        self.finish("retrieve_memories_with_allowlist", result)
    }
}

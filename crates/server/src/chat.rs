//! Chat action adapter: turns a chat message into a pipeline call and a
//! reply text.
//!
//! Parameters come either pre-extracted with the request or from the
//! configured [`IntentExtractor`]. Workflow failures are not HTTP errors;
//! they produce a reply with `success: false` whose text embeds the error.

use std::fmt::Write as _;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use harbor_core::{
    BASE_UNITS_PER_TOKEN, Caller, DownloadTicket, HarborError, ResourceType, WorkflowOutcome,
};
use harbor_intent::{ActionRequest, CollectionParams, Intent, IntentExtractor};
use harbor_pipeline::{
    CollectionList, CollectionSpec, MemoryTarget, MintGatedStore, MintRetrieveReceipt, NftList,
    Pipeline,
};
use harbor_staging::{DownloadStore, PendingUpload, StagingError, UploadStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};

use crate::error::ServerError;

/// Display symbol of the ledger token.
pub const TOKEN_SYMBOL: &str = "SUI";

const NO_UPLOAD: &str = "No uploaded file found. Please upload a file first.";

/// Body of `POST /v1/chat/{action}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub agent_id: String,
    pub entity_id: String,
    #[serde(default)]
    pub room_id: Option<String>,
    /// Recent conversation the parameters are extracted from.
    #[serde(default)]
    pub recent_messages: String,
    /// Already-extracted parameters. Skips the completion call.
    #[serde(default)]
    pub params: Option<Value>,
}

impl ChatRequest {
    fn caller(&self) -> Caller {
        let caller = Caller::new(&self.agent_id, &self.entity_id);
        match &self.room_id {
            Some(room) => caller.with_room(room),
            None => caller,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub action: &'static str,
    pub success: bool,
    pub text: String,
    /// The workflow outcome behind the reply.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ChatReply {
    fn new<T: Serialize>(
        intent: Intent,
        outcome: &WorkflowOutcome<T>,
        on_success: impl FnOnce(&T) -> String,
        failure_prefix: &str,
    ) -> Self {
        let text = match outcome {
            WorkflowOutcome::Success(value) => on_success(value),
            WorkflowOutcome::Failure(e) => format!("{failure_prefix}: {e}"),
        };
        Self {
            action: intent.name(),
            success: outcome.is_success(),
            text,
            data: serde_json::to_value(outcome).unwrap_or(Value::Null),
        }
    }

    fn failed(intent: Intent, text: impl Into<String>) -> Self {
        Self {
            action: intent.name(),
            success: false,
            text: text.into(),
            data: Value::Null,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn tokens(base_units: u64) -> f64 {
    base_units as f64 / BASE_UNITS_PER_TOKEN as f64
}

fn collection_spec(params: CollectionParams) -> CollectionSpec {
    CollectionSpec {
        name: params.name,
        max_supply: params.max_supply,
        mint_price: params.mint_price,
    }
}

fn download_text(url: &str) -> String {
    format!("File downloaded successfully. [Download File]({url})")
}

fn format_nfts(list: &NftList) -> String {
    if list.nfts.is_empty() {
        return "You do not own any AccessNFTs.".to_owned();
    }
    let entries: Vec<String> = list
        .nfts
        .iter()
        .map(|nft| {
            format!(
                "NFT ID: {}\nCollection ID: {}\nOwner: {}\n",
                nft.id, nft.collection_id, nft.owner
            )
        })
        .collect();
    format!("Found {} AccessNFTs:\n\n{}", list.nfts.len(), entries.join("\n---\n"))
}

fn format_collections(list: &CollectionList) -> String {
    if list.collections.is_empty() {
        return "No collections found.".to_owned();
    }
    let entries: Vec<String> = list
        .collections
        .iter()
        .map(|c| {
            let mut entry = format!("Collection ID: {}\nName: {}\n", c.id, c.name);
            if let Some(file_name) = &c.file_name {
                let _ = writeln!(entry, "File Name: {file_name}");
            }
            if let Some(size) = c.file_size {
                let _ = writeln!(entry, "File Size: {size} bytes");
            }
            if let Some(resource_type) = c.resource_type {
                let kind = match resource_type {
                    ResourceType::File => "File",
                    ResourceType::Memory => "Memory",
                };
                let _ = writeln!(entry, "Resource Type: {kind}");
            }
            let _ = write!(
                entry,
                "Minted: {}/{}\nMint Price: {} {TOKEN_SYMBOL}\nOwner: {}\n",
                c.minted,
                c.max_supply,
                c.mint_price_tokens(),
                c.owner
            );
            entry
        })
        .collect();
    format!(
        "Found {} collections:\n\n{}",
        list.collections.len(),
        entries.join("\n---\n")
    )
}

/// Runs chat actions against the pipeline.
pub struct ChatAdapter {
    pipeline: Arc<Pipeline>,
    extractor: Option<Arc<dyn IntentExtractor>>,
    uploads: Arc<UploadStore>,
    downloads: Arc<dyn DownloadStore>,
}

impl ChatAdapter {
    pub fn new(
        pipeline: Arc<Pipeline>,
        extractor: Option<Arc<dyn IntentExtractor>>,
        uploads: Arc<UploadStore>,
        downloads: Arc<dyn DownloadStore>,
    ) -> Self {
        Self {
            pipeline,
            extractor,
            uploads,
            downloads,
        }
    }

    /// Resolve parameters for `intent` and run it.
    pub async fn handle(
        &self,
        intent: Intent,
        request: ChatRequest,
    ) -> Result<ChatReply, ServerError> {
        let params = match (&request.params, &self.extractor) {
            (Some(params), _) => params.clone(),
            (None, _) if !intent.needs_extraction() => Value::Null,
            (None, Some(extractor)) => extractor.extract(intent, &request.recent_messages).await?,
            (None, None) => {
                return Err(ServerError::BadRequest(format!(
                    "intent extraction is disabled; {intent} needs explicit params"
                )));
            }
        };
        let action = ActionRequest::parse(intent, &params, Utc::now())?;
        let caller = request.caller();
        let span = info_span!("chat_action", action = intent.name(), agent_id = %caller.agent_id);
        let reply = self.run(intent, action, &caller).instrument(span).await;
        info!(action = reply.action, success = reply.success, "chat action handled");
        Ok(reply)
    }

    /// Bytes of a pending upload; `None` when it is gone or unreadable.
    async fn pending(&self, file_id: &str) -> Option<(PendingUpload, Bytes)> {
        match self.uploads.read(file_id).await {
            Ok(found) => Some(found),
            Err(StagingError::UploadNotFound(_)) => None,
            Err(e) => {
                warn!(file_id, error = %e, "pending upload unreadable");
                None
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn run(&self, intent: Intent, action: ActionRequest, caller: &Caller) -> ChatReply {
        let p = &self.pipeline;
        match action {
            ActionRequest::CreateAllowlist { name } => ChatReply::new(
                intent,
                &p.create_allowlist(&name).await,
                |r| {
                    format!(
                        "Allowlist entry created successfully!\ntxId: {}\nallowlistId: {}\ncapId: {}",
                        r.digest, r.allowlist_id, r.cap_id
                    )
                },
                "Failed to create allowlist entry",
            ),
            ActionRequest::AddAllowlistMember {
                allowlist_id,
                cap_id,
                address,
            } => ChatReply::new(
                intent,
                &p.add_allowlist_member(&allowlist_id, &cap_id, &address).await,
                |r| format!("Added {address} to allowlist successfully!\ntxId: {}", r.digest),
                "Failed to add allowlist member",
            ),
            ActionRequest::CreateCollection(params) => {
                let spec = collection_spec(params);
                ChatReply::new(
                    intent,
                    &p.create_collection(&spec).await,
                    |r| {
                        format!(
                            "Successfully created NFT collection!\nCollection ID: {}\nMint Price: {} {TOKEN_SYMBOL}\nMax Supply: {}",
                            r.collection_id,
                            tokens(spec.mint_price),
                            spec.max_supply
                        )
                    },
                    "Failed to create collection",
                )
            }
            ActionRequest::StoreFile {
                file_id,
                policy_id,
                retention,
            } => {
                let Some((_, data)) = self.pending(&file_id).await else {
                    return ChatReply::failed(intent, NO_UPLOAD);
                };
                let outcome = p.store_with_allowlist(data, &policy_id, retention).await;
                if outcome.is_success() {
                    self.uploads.remove(&file_id).await;
                }
                ChatReply::new(
                    intent,
                    &outcome,
                    |r| format!("File uploaded successfully!\nblobId: {}", r.blob_id),
                    "Failed to upload file",
                )
            }
            ActionRequest::RetrieveFile {
                blob_id,
                policy_id,
                file_name,
            } => {
                let outcome: WorkflowOutcome<DownloadTicket> =
                    match p.retrieve_with_allowlist(&blob_id, &policy_id).await {
                        WorkflowOutcome::Success(plaintext) => {
                            let name = file_name.unwrap_or_else(|| format!("{blob_id}.bin"));
                            self.downloads
                                .stage(&name, plaintext)
                                .await
                                .map_err(|e| HarborError::Storage(e.to_string()))
                                .into()
                        }
                        WorkflowOutcome::Failure(e) => WorkflowOutcome::Failure(e),
                    };
                ChatReply::new(
                    intent,
                    &outcome,
                    |ticket| download_text(&ticket.url),
                    "Failed to download file",
                )
            }
            ActionRequest::StoreMemory {
                policy_id,
                table_name,
                retention,
            } => ChatReply::new(
                intent,
                &p.store_memories(
                    caller,
                    &table_name,
                    MemoryTarget::Allowlist {
                        policy_id,
                        retention,
                    },
                )
                .await,
                |r| format!("memory uploaded successfully!\nblobId: {}", r.blob_id),
                "Failed to upload memory",
            ),
            ActionRequest::RetrieveMemory { blob_id, policy_id } => ChatReply::new(
                intent,
                &p.retrieve_memories_with_allowlist(&blob_id, &policy_id, caller)
                    .await,
                |_| "memory downloaded successfully!".to_owned(),
                "Failed to download memory",
            ),
            ActionRequest::MintGatedFile {
                file_id,
                collection,
                retention,
            } => {
                let Some((upload, data)) = self.pending(&file_id).await else {
                    return ChatReply::failed(intent, NO_UPLOAD);
                };
                let request = MintGatedStore {
                    collection: collection_spec(collection),
                    file_name: upload.file_name,
                    resource_type: ResourceType::File,
                    retention,
                };
                let outcome = p.mint_gated_store(data, request).await;
                if outcome.is_success() {
                    self.uploads.remove(&file_id).await;
                }
                ChatReply::new(
                    intent,
                    &outcome,
                    |r| {
                        format!(
                            "File uploaded successfully and NFT collection created!\n\nCollection ID: {}\nName: {}\nMax Supply: {}\nMint Price: {} {TOKEN_SYMBOL}\nBlob ID: {}",
                            r.collection_id,
                            r.collection.name,
                            r.collection.max_supply,
                            tokens(r.collection.mint_price),
                            r.blob_id
                        )
                    },
                    "Failed to upload file with NFT",
                )
            }
            ActionRequest::MintGatedMemory {
                table_name,
                collection,
                retention,
            } => ChatReply::new(
                intent,
                &p.store_memories(
                    caller,
                    &table_name,
                    MemoryTarget::MintGated {
                        collection: collection_spec(collection),
                        retention,
                    },
                )
                .await,
                |r| {
                    let mut text =
                        "Memory uploaded successfully and NFT collection created!\n\n".to_owned();
                    if let Some(c) = &r.collection {
                        let _ = write!(
                            text,
                            "Collection ID: {}\nName: {}\nMax Supply: {}\nMint Price: {} {TOKEN_SYMBOL}\n",
                            c.collection_id,
                            c.collection.name,
                            c.collection.max_supply,
                            tokens(c.collection.mint_price)
                        );
                    }
                    let _ = write!(
                        text,
                        "Blob ID: {}\nMemory size: {} messages",
                        r.blob_id, r.record_count
                    );
                    text
                },
                "Failed to upload memory with NFT",
            ),
            ActionRequest::MintAccessNft {
                collection_id,
                payment,
            } => ChatReply::new(
                intent,
                &p.mint_access_nft(&collection_id, payment).await,
                |r| {
                    format!(
                        "Successfully minted AccessNFT!\nNFT ID: {}\nCollection ID: {}\nTransaction ID: {}\nMint Price: {} {TOKEN_SYMBOL}",
                        r.nft_id,
                        r.collection_id,
                        r.digest,
                        tokens(r.paid)
                    )
                },
                "Failed to mint AccessNFT",
            ),
            ActionRequest::RetrieveWithNft { nft_id } => ChatReply::new(
                intent,
                &p.mint_gated_retrieve(&nft_id, caller).await,
                |r| match r {
                    MintRetrieveReceipt::Memory(_) => "memory downloaded successfully!".to_owned(),
                    MintRetrieveReceipt::File(ticket) => download_text(&ticket.url),
                },
                "Failed to download with NFT",
            ),
            ActionRequest::DownloadFile { blob_id, file_name } => ChatReply::new(
                intent,
                &p.download_blob(&blob_id, &file_name).await,
                |ticket| download_text(&ticket.url),
                "Failed to download file",
            ),
            ActionRequest::ListMyNfts => ChatReply::new(
                intent,
                &p.list_my_nfts().await,
                format_nfts,
                "Failed to list NFTs",
            ),
            ActionRequest::ListCollections => ChatReply::new(
                intent,
                &p.list_my_collections().await,
                format_collections,
                "Failed to list collections",
            ),
        }
    }
}

impl std::fmt::Debug for ChatAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatAdapter")
            .field("extraction", &self.extractor.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::{AccessNft, Address, CollectionInfo, ObjectId};

    #[test]
    fn empty_lists_have_friendly_text() {
        assert_eq!(
            format_nfts(&NftList { nfts: vec![] }),
            "You do not own any AccessNFTs."
        );
        assert_eq!(
            format_collections(&CollectionList {
                collections: vec![]
            }),
            "No collections found."
        );
    }

    #[test]
    fn nft_list_names_every_token() {
        let nft = |id: &str| AccessNft {
            id: ObjectId::new(id),
            collection_id: ObjectId::new("0xc0"),
            owner: Address::new("0xme"),
        };
        let text = format_nfts(&NftList {
            nfts: vec![nft("0x1"), nft("0x2")],
        });
        assert!(text.starts_with("Found 2 AccessNFTs:"));
        assert!(text.contains("NFT ID: 0x1") && text.contains("NFT ID: 0x2"));
        assert!(text.contains("\n---\n"));
    }

    #[test]
    fn collection_text_shows_price_in_tokens() {
        let text = format_collections(&CollectionList {
            collections: vec![CollectionInfo {
                id: ObjectId::new("0xc0"),
                name: "docs".into(),
                owner: Address::new("0xme"),
                max_supply: 10,
                mint_price: 1_000_000,
                minted: 3,
                blob_id: None,
                file_name: Some("a.pdf".into()),
                file_size: Some(12),
                resource_type: Some(ResourceType::File),
                end_epoch: None,
            }],
        });
        assert!(text.contains("Minted: 3/10"));
        assert!(text.contains("Mint Price: 0.001 SUI"));
        assert!(text.contains("Resource Type: File"));
    }
}

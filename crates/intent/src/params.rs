//! Typed parameters parsed from extracted JSON, with defaults applied.

use chrono::{DateTime, SecondsFormat, Utc};
use harbor_core::{
    Address, BlobId, DEFAULT_EPOCHS, ObjectId, PolicyId, ResourceType, RetentionParams,
    tokens_to_base_units,
};
use serde_json::{Map, Value};

use crate::error::IntentError;
use crate::intent::Intent;

/// Default row source for memory uploads.
pub const DEFAULT_TABLE: &str = "messages";
/// Default number of access NFTs a collection may mint.
pub const DEFAULT_MAX_SUPPLY: u64 = 10;
/// Default mint price (in whole tokens) for memory collections.
pub const DEFAULT_MEMORY_MINT_PRICE: f64 = 0.001;

/// Read-only view over an extracted JSON object.
///
/// Completion models often print `null` as the string `"null"`; both count
/// as absent, as does the empty string.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value) -> Result<Self, IntentError> {
        value
            .as_object()
            .map(|map| Self { map })
            .ok_or_else(|| IntentError::ParseError(format!("expected a JSON object, got {value}")))
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        match self.map.get(key)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() || s.eq_ignore_ascii_case("null") => None,
            v => Some(v),
        }
    }

    pub fn opt_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.trim().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn required_str(&self, key: &'static str) -> Result<String, IntentError> {
        self.opt_str(key).ok_or(IntentError::MissingField(key))
    }

    pub fn opt_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn opt_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn opt_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Retention with the defaults (deletable, 3 epochs) filled in.
    #[must_use]
    pub fn retention(&self) -> RetentionParams {
        RetentionParams::new(
            self.opt_bool("deletable").unwrap_or(true),
            self.opt_u64("epochs")
                .and_then(|e| u32::try_from(e).ok())
                .unwrap_or(DEFAULT_EPOCHS),
        )
    }
}

/// Parameters for creating a mint-gated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionParams {
    pub name: String,
    pub max_supply: u64,
    /// Mint price in base units.
    pub mint_price: u64,
}

impl CollectionParams {
    fn from_fields(
        fields: &Fields<'_>,
        resource_type: ResourceType,
        now: DateTime<Utc>,
    ) -> Self {
        let default_price = match resource_type {
            ResourceType::File => 0.0,
            ResourceType::Memory => DEFAULT_MEMORY_MINT_PRICE,
        };
        Self {
            name: fields
                .opt_str("name")
                .unwrap_or_else(|| default_collection_name(resource_type, now)),
            max_supply: fields.opt_u64("maxSupply").unwrap_or(DEFAULT_MAX_SUPPLY),
            mint_price: tokens_to_base_units(fields.opt_f64("mintPrice").unwrap_or(default_price)),
        }
    }
}

/// `"File NFT Collection 2026-01-02T03:04:05.000Z"` style default name.
#[must_use]
pub fn default_collection_name(resource_type: ResourceType, now: DateTime<Utc>) -> String {
    let kind = match resource_type {
        ResourceType::File => "File",
        ResourceType::Memory => "Memory",
    };
    format!(
        "{kind} NFT Collection {}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// A chat action with its parameters resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    CreateAllowlist {
        name: String,
    },
    AddAllowlistMember {
        allowlist_id: ObjectId,
        cap_id: ObjectId,
        address: Address,
    },
    CreateCollection(CollectionParams),
    StoreFile {
        file_id: String,
        policy_id: PolicyId,
        retention: RetentionParams,
    },
    RetrieveFile {
        blob_id: BlobId,
        policy_id: PolicyId,
        file_name: Option<String>,
    },
    StoreMemory {
        policy_id: PolicyId,
        table_name: String,
        retention: RetentionParams,
    },
    RetrieveMemory {
        blob_id: BlobId,
        policy_id: PolicyId,
    },
    MintGatedFile {
        file_id: String,
        collection: CollectionParams,
        retention: RetentionParams,
    },
    MintGatedMemory {
        table_name: String,
        collection: CollectionParams,
        retention: RetentionParams,
    },
    MintAccessNft {
        collection_id: ObjectId,
        /// Payment in base units; the collection price when absent.
        payment: Option<u64>,
    },
    RetrieveWithNft {
        nft_id: ObjectId,
    },
    DownloadFile {
        blob_id: BlobId,
        file_name: String,
    },
    ListMyNfts,
    ListCollections,
}

impl ActionRequest {
    /// Resolve the extracted JSON for `intent` into typed parameters.
    pub fn parse(intent: Intent, value: &Value, now: DateTime<Utc>) -> Result<Self, IntentError> {
        let f = match intent {
            Intent::ListMyNfts => return Ok(Self::ListMyNfts),
            Intent::ListCollections => return Ok(Self::ListCollections),
            _ => Fields::new(value)?,
        };
        let table = || f.opt_str("tableName").unwrap_or_else(|| DEFAULT_TABLE.to_owned());

        Ok(match intent {
            Intent::CreateAllowlist => Self::CreateAllowlist {
                name: f.required_str("name")?,
            },
            Intent::AddAllowlistMember => Self::AddAllowlistMember {
                allowlist_id: f.required_str("allowlistId")?.into(),
                cap_id: f.required_str("capId")?.into(),
                address: f.required_str("address")?.into(),
            },
            Intent::CreateCollection => {
                let resource_type = match f.opt_str("resourceType").as_deref() {
                    Some(t) if t.eq_ignore_ascii_case("memory") => ResourceType::Memory,
                    _ => ResourceType::File,
                };
                Self::CreateCollection(CollectionParams::from_fields(&f, resource_type, now))
            }
            Intent::EncryptAndUploadFile => Self::StoreFile {
                file_id: f.required_str("fileId")?,
                policy_id: f.required_str("allowlistId")?.into(),
                retention: f.retention(),
            },
            Intent::DownloadAndDecryptFile => Self::RetrieveFile {
                blob_id: f.required_str("blobId")?.into(),
                policy_id: f.required_str("allowlistId")?.into(),
                file_name: f.opt_str("fileName"),
            },
            Intent::EncryptAndUploadMemory => Self::StoreMemory {
                policy_id: f.required_str("allowlistId")?.into(),
                table_name: table(),
                retention: f.retention(),
            },
            Intent::DownloadAndDecryptMemory => Self::RetrieveMemory {
                blob_id: f.required_str("blobId")?.into(),
                policy_id: f.required_str("allowlistId")?.into(),
            },
            Intent::UploadFileWithNft => Self::MintGatedFile {
                file_id: f.required_str("fileId")?,
                collection: CollectionParams::from_fields(&f, ResourceType::File, now),
                retention: f.retention(),
            },
            Intent::UploadMemoryWithNft => Self::MintGatedMemory {
                table_name: table(),
                collection: CollectionParams::from_fields(&f, ResourceType::Memory, now),
                retention: f.retention(),
            },
            Intent::MintAccessNft => Self::MintAccessNft {
                collection_id: f.required_str("collectionId")?.into(),
                payment: f.opt_f64("paymentAmount").map(tokens_to_base_units),
            },
            Intent::DownloadWithNft => Self::RetrieveWithNft {
                nft_id: f.required_str("nft")?.into(),
            },
            Intent::DownloadFile => Self::DownloadFile {
                blob_id: f.required_str("blobId")?.into(),
                file_name: f.required_str("fileName")?,
            },
            Intent::ListMyNfts => Self::ListMyNfts,
            Intent::ListCollections => Self::ListCollections,
        })
    }
}

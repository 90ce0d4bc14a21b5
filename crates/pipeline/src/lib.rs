//! Orchestration of Harbor's encrypted storage workflows.
//!
//! A [`Pipeline`] chains threshold encryption, blob storage and ledger
//! access control for four workflows:
//!
//! * [`store_with_allowlist`](Pipeline::store_with_allowlist): encrypt
//!   under an allowlist, write the blob.
//! * [`retrieve_with_allowlist`](Pipeline::retrieve_with_allowlist): read,
//!   check the embedded policy, build the approval proof, decrypt.
//! * [`mint_gated_store`](Pipeline::mint_gated_store): create a collection,
//!   encrypt under it, write, record metadata.
//! * [`mint_gated_retrieve`](Pipeline::mint_gated_retrieve): resolve NFT and
//!   collection, read, decrypt, then restore memories or stage a download.
//!
//! Collaborator failures are mapped onto [`harbor_core::HarborError`] and
//! returned as a [`harbor_core::WorkflowOutcome`].

pub mod actions;
pub mod builder;
pub mod error;
pub mod memories;
pub mod memory_store;
pub mod metrics;
pub mod pipeline;
pub mod receipts;

pub use builder::{DEFAULT_THRESHOLD, PipelineBuilder};
pub use error::PipelineError;
pub use memory_store::{InMemoryMemoryStore, MemoryQuery, MemoryStore};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::{DEFAULT_MEMORY_TABLE, Pipeline};
pub use receipts::{
    AllowlistReceipt, CollectionList, CollectionReceipt, CollectionSpec, MemoryRestore,
    MemoryStoreReceipt, MemoryTarget, MintGatedStore, MintReceipt, MintRetrieveReceipt,
    MintStoreReceipt, NftList, StoreReceipt, TxReceipt,
};

pub mod client;
pub mod error;
pub mod memory;
pub mod objects;
pub mod signer;
pub mod tx;

pub use client::{CreatedObject, LedgerClient, LedgerObject, TransactionEffects};
pub use error::{AbortCode, LedgerError};
pub use memory::MemoryLedger;
pub use objects::{
    ACCESS_NFT_TYPE, ALLOWLIST_TYPE, CAP_TYPE, COLLECTION_TYPE, access_nft_from_object,
    allowlist_members, collection_from_object,
};
pub use signer::{AgentSigner, SignedTransaction, address_of, verify_personal_message};
pub use tx::{
    AccessControlTx, Argument, CollectionMetadata, MoveCall, PackageIds, SEAL_APPROVE, Transaction,
};

pub mod error;
pub mod memory;
pub mod store;
pub mod types;
pub mod walrus;

pub use error::BlobError;
pub use memory::MemoryBlobStore;
pub use store::BlobStore;
pub use types::BlobRecord;
pub use walrus::{WalrusConfig, WalrusHttpStore};

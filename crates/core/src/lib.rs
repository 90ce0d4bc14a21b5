pub mod caller;
pub mod collection;
pub mod download;
pub mod error;
pub mod memory;
pub mod outcome;
pub mod policy;
pub mod retention;
pub mod types;

pub use caller::Caller;
pub use collection::{
    AccessNft, BASE_UNITS_PER_TOKEN, CollectionInfo, ResourceType, tokens_to_base_units,
};
pub use download::DownloadTicket;
pub use error::{ErrorKind, HarborError};
pub use memory::{MemoryRecord, ParsedMemories, is_valid_memory, parse_memory_array};
pub use outcome::WorkflowOutcome;
pub use policy::PolicyKind;
pub use retention::{DEFAULT_EPOCHS, RetentionParams};
pub use types::{Address, BlobId, ObjectId, PolicyId};

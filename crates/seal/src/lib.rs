pub mod client;
pub mod committee;
pub mod envelope;
pub mod error;
pub mod session;

pub use client::{EncryptRequest, ThresholdEncryptor};
pub use committee::LocalKeyServerCommittee;
pub use envelope::{EncryptedObject, WrappedShare};
pub use error::SealError;
pub use session::{DEFAULT_SESSION_TTL_MINUTES, SessionCredentials};

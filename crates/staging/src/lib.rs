//! Short-lived server-side state bridging HTTP requests and chat actions:
//! pending uploads, chunked upload assembly and single-use download tokens.
//! Every store is explicitly constructed and injected; expiry is TTL-based
//! with a periodic [`Sweeper`] for file cleanup.

pub mod chunks;
pub mod download;
pub mod error;
pub mod files;
pub mod sweeper;
pub mod upload;

pub use chunks::{ChunkAssembler, ChunkProgress};
pub use download::{DiskDownloadStore, DownloadStore, DownloadedFile};
pub use error::StagingError;
pub use files::{OCTET_STREAM, content_type_for, sanitize_file_name};
pub use sweeper::{Sweepable, Sweeper};
pub use upload::{PendingUpload, UploadStore};

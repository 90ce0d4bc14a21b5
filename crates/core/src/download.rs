use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short-lived, single-use link to a decrypted file staged on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTicket {
    pub token: String,
    /// Absolute URL the chat reply links to.
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub expires_at: DateTime<Utc>,
}

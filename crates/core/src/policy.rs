use serde::{Deserialize, Serialize};
use std::fmt;

/// Which access-control contract a ciphertext is bound to.
///
/// The pipeline uses this tag to pick the contract package used at
/// encryption time and the approval call used at decryption time, so the
/// two paths cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// An allowlist object whose members may decrypt.
    Allowlist,
    /// An NFT collection; holders of an access NFT may decrypt.
    MintGated,
}

impl PolicyKind {
    /// Name of the on-ledger module implementing this policy.
    #[must_use]
    pub fn module(self) -> &'static str {
        match self {
            Self::Allowlist => "allowlist",
            Self::MintGated => "file_nft",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowlist => f.write_str("allowlist"),
            Self::MintGated => f.write_str("mint_gated"),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::types::{Address, BlobId, ObjectId};

/// Number of base units in one whole ledger token.
pub const BASE_UNITS_PER_TOKEN: u64 = 1_000_000_000;

/// Kind of content stored behind a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// An uploaded file, served back through a download link.
    File,
    /// A JSON array of agent memory records.
    Memory,
}

impl ResourceType {
    /// On-ledger `u8` encoding.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::File => 0,
            Self::Memory => 1,
        }
    }

    /// Decode the on-ledger `u8` encoding.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::File),
            1 => Some(Self::Memory),
            _ => None,
        }
    }
}

/// An NFT collection gating access to one stored blob.
///
/// Collections are created empty and receive their storage metadata in a
/// second transaction once the blob exists, so `blob_id` is `None` until
/// then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: ObjectId,
    pub name: String,
    pub owner: Address,
    pub max_supply: u64,
    /// Mint price in base units.
    pub mint_price: u64,
    pub minted: u64,
    pub blob_id: Option<BlobId>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub resource_type: Option<ResourceType>,
    pub end_epoch: Option<u64>,
}

impl CollectionInfo {
    /// Whether the storage metadata has been attached.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        self.blob_id.is_some()
    }

    /// Mint price in whole tokens, for display.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mint_price_tokens(&self) -> f64 {
        self.mint_price as f64 / BASE_UNITS_PER_TOKEN as f64
    }
}

/// Convert a price in whole tokens to base units, rounding to the nearest unit.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn tokens_to_base_units(tokens: f64) -> u64 {
    if !tokens.is_finite() || tokens <= 0.0 {
        return 0;
    }
    (tokens * BASE_UNITS_PER_TOKEN as f64).round() as u64
}

/// A minted access token whose ownership authorizes decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessNft {
    pub id: ObjectId,
    pub collection_id: ObjectId,
    pub owner: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type_encoding() {
        assert_eq!(ResourceType::File.as_u8(), 0);
        assert_eq!(ResourceType::Memory.as_u8(), 1);
        assert_eq!(ResourceType::from_u8(1), Some(ResourceType::Memory));
        assert_eq!(ResourceType::from_u8(7), None);
    }

    #[test]
    fn token_conversion() {
        assert_eq!(tokens_to_base_units(0.001), 1_000_000);
        assert_eq!(tokens_to_base_units(1.5), 1_500_000_000);
        assert_eq!(tokens_to_base_units(-3.0), 0);
        assert_eq!(tokens_to_base_units(f64::NAN), 0);
    }

    #[test]
    fn unprovisioned_collection() {
        let info = CollectionInfo {
            id: ObjectId::new("0x1"),
            name: "c".into(),
            owner: Address::new("0x2"),
            max_supply: 10,
            mint_price: 500_000_000,
            minted: 0,
            blob_id: None,
            file_name: None,
            file_size: None,
            resource_type: None,
            end_epoch: None,
        };
        assert!(!info.is_provisioned());
        assert!((info.mint_price_tokens() - 0.5).abs() < f64::EPSILON);
    }
}

//! Typed views over raw [`LedgerObject`]s.

use harbor_core::{AccessNft, Address, BlobId, CollectionInfo, ObjectId, ResourceType};

use crate::client::LedgerObject;
use crate::error::LedgerError;

pub const ALLOWLIST_TYPE: &str = "allowlist::Allowlist";
pub const CAP_TYPE: &str = "allowlist::Cap";
pub const COLLECTION_TYPE: &str = "file_nft::Collection";
pub const ACCESS_NFT_TYPE: &str = "file_nft::AccessNFT";

fn expect_type(obj: &LedgerObject, suffix: &str) -> Result<(), LedgerError> {
    if obj.is_type(suffix) {
        Ok(())
    } else {
        Err(LedgerError::MalformedObject {
            id: obj.id.to_string(),
            reason: format!("expected {suffix}, found {}", obj.object_type),
        })
    }
}

/// Interpret a ledger object as a file NFT collection.
pub fn collection_from_object(obj: &LedgerObject) -> Result<CollectionInfo, LedgerError> {
    expect_type(obj, COLLECTION_TYPE)?;
    let resource_type = match obj.opt_u64_field("resource_type") {
        Some(raw) => Some(
            u8::try_from(raw)
                .ok()
                .and_then(ResourceType::from_u8)
                .ok_or_else(|| LedgerError::MalformedObject {
                    id: obj.id.to_string(),
                    reason: format!("unknown resource type {raw}"),
                })?,
        ),
        None => None,
    };
    Ok(CollectionInfo {
        id: obj.id.clone(),
        name: obj.str_field("name")?.to_owned(),
        owner: obj.owner.clone(),
        max_supply: obj.u64_field("max_supply")?,
        mint_price: obj.u64_field("mint_price")?,
        minted: obj.u64_field("minted")?,
        blob_id: obj.opt_str_field("blob_id").map(BlobId::from),
        file_name: obj.opt_str_field("file_name").map(str::to_owned),
        file_size: obj.opt_u64_field("file_size"),
        resource_type,
        end_epoch: obj.opt_u64_field("end_epoch"),
    })
}

/// Interpret a ledger object as an access NFT.
pub fn access_nft_from_object(obj: &LedgerObject) -> Result<AccessNft, LedgerError> {
    expect_type(obj, ACCESS_NFT_TYPE)?;
    Ok(AccessNft {
        id: obj.id.clone(),
        collection_id: ObjectId::new(obj.str_field("collection_id")?),
        owner: obj.owner.clone(),
    })
}

/// Members of an allowlist object.
pub fn allowlist_members(obj: &LedgerObject) -> Result<Vec<Address>, LedgerError> {
    expect_type(obj, ALLOWLIST_TYPE)?;
    let list = obj
        .fields
        .get("list")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| LedgerError::MalformedObject {
            id: obj.id.to_string(),
            reason: "missing field `list`".into(),
        })?;
    Ok(list
        .iter()
        .filter_map(serde_json::Value::as_str)
        .map(Address::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(ty: &str, fields: serde_json::Value) -> LedgerObject {
        LedgerObject {
            id: ObjectId::new("0x11"),
            object_type: format!("0xb::{ty}"),
            owner: Address::new("0xowner"),
            version: 1,
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn unprovisioned_collection_has_no_metadata() {
        let obj = object(
            COLLECTION_TYPE,
            json!({"name": "c", "max_supply": 10, "mint_price": 0, "minted": 0,
                   "blob_id": null, "file_name": null}),
        );
        let info = collection_from_object(&obj).unwrap();
        assert!(!info.is_provisioned());
        assert_eq!(info.resource_type, None);
    }

    #[test]
    fn provisioned_collection_parses_metadata() {
        let obj = object(
            COLLECTION_TYPE,
            json!({"name": "c", "max_supply": 10, "mint_price": 1_000_000, "minted": 2,
                   "blob_id": "b1", "file_name": "f.txt", "file_size": 5,
                   "resource_type": 1, "end_epoch": 7}),
        );
        let info = collection_from_object(&obj).unwrap();
        assert_eq!(info.blob_id.as_deref(), Some("b1"));
        assert_eq!(info.resource_type, Some(ResourceType::Memory));
        assert_eq!(info.end_epoch, Some(7));
    }

    #[test]
    fn wrong_type_is_malformed() {
        let obj = object(ACCESS_NFT_TYPE, json!({"collection_id": "0x1"}));
        assert!(matches!(
            collection_from_object(&obj),
            Err(LedgerError::MalformedObject { .. })
        ));
        assert_eq!(
            access_nft_from_object(&obj).unwrap().collection_id.as_str(),
            "0x1"
        );
    }

    #[test]
    fn unknown_resource_type_is_malformed() {
        let obj = object(
            COLLECTION_TYPE,
            json!({"name": "c", "max_supply": 1, "mint_price": 0, "minted": 0, "resource_type": 9}),
        );
        assert!(collection_from_object(&obj).is_err());
    }
}

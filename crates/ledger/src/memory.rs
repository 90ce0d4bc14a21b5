use std::collections::HashMap;

use async_trait::async_trait;
use harbor_core::{Address, ObjectId, PolicyId};
use parking_lot::Mutex;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::client::{CreatedObject, LedgerClient, LedgerObject, TransactionEffects};
use crate::error::{AbortCode, LedgerError};
use crate::objects::{ACCESS_NFT_TYPE, ALLOWLIST_TYPE, CAP_TYPE, COLLECTION_TYPE};
use crate::signer::SignedTransaction;
use crate::tx::{ALLOWLIST_MODULE, Argument, FILE_NFT_MODULE, MoveCall, PackageIds, Transaction};

#[derive(Debug, Clone, Default)]
struct State {
    objects: HashMap<ObjectId, LedgerObject>,
    transactions: u64,
}

/// Scratch space for one transaction: a copy of the state plus what the
/// calls created or touched. Committed only if every call succeeds.
struct Execution<'a> {
    state: State,
    packages: &'a PackageIds,
    sender: &'a Address,
    digest: String,
    created: Vec<CreatedObject>,
    mutated: Vec<ObjectId>,
}

/// In-process ledger executing the `allowlist` and `file_nft` contract
/// modules.
///
/// Transactions are verified, applied atomically against a copy of the
/// state, and committed only if every call succeeds.
#[derive(Debug)]
pub struct MemoryLedger {
    packages: PackageIds,
    state: Mutex<State>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new(packages: PackageIds) -> Self {
        Self {
            packages,
            state: Mutex::new(State::default()),
        }
    }

    #[must_use]
    pub fn packages(&self) -> &PackageIds {
        &self.packages
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> u64 {
        self.state.lock().transactions
    }

    /// Number of live objects whose type ends with `suffix`.
    pub fn count_of_type(&self, suffix: &str) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|o| o.is_type(suffix))
            .count()
    }

    /// Place an allowlist at a fixed id, as if published at genesis.
    pub fn seed_allowlist(&self, id: ObjectId, owner: &Address, members: &[Address]) {
        let list: Vec<Value> = members
            .iter()
            .map(|m| Value::String(m.to_string()))
            .collect();
        let object = LedgerObject {
            id: id.clone(),
            object_type: format!("{}::{ALLOWLIST_TYPE}", self.packages.allowlist),
            owner: owner.clone(),
            version: 1,
            fields: json!({"name": "genesis", "list": list})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        };
        self.state.lock().objects.insert(id, object);
    }

    fn run<'a>(
        &'a self,
        state: State,
        sender: &'a Address,
        kind_bytes: &[u8],
        tx: &Transaction,
    ) -> Result<Execution<'a>, LedgerError> {
        let seq = state.transactions;
        let mut hasher = Sha256::new();
        hasher.update(sender.as_bytes());
        hasher.update(seq.to_le_bytes());
        hasher.update(kind_bytes);
        let digest = hex::encode(hasher.finalize());

        let mut exec = Execution {
            state,
            packages: &self.packages,
            sender,
            digest,
            created: Vec::new(),
            mutated: Vec::new(),
        };
        for call in &tx.calls {
            exec.apply(call)?;
        }
        Ok(exec)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(PackageIds::default())
    }
}

fn abort(call: &MoveCall, code: AbortCode) -> LedgerError {
    LedgerError::Abort {
        module: call.module.clone(),
        function: call.function.clone(),
        code,
    }
}

fn bad_arg(call: &MoveCall, index: usize, expected: &str) -> LedgerError {
    LedgerError::InvalidTransaction(format!(
        "{} expects {expected} at argument {index}",
        call.target()
    ))
}

fn arg<'c>(call: &'c MoveCall, index: usize) -> Option<&'c Argument> {
    call.arguments.get(index)
}

fn arg_object(call: &MoveCall, index: usize) -> Result<&ObjectId, LedgerError> {
    match arg(call, index) {
        Some(Argument::Object(id)) => Ok(id),
        _ => Err(bad_arg(call, index, "object")),
    }
}

fn arg_string(call: &MoveCall, index: usize) -> Result<&str, LedgerError> {
    match arg(call, index) {
        Some(Argument::String(s)) => Ok(s),
        _ => Err(bad_arg(call, index, "string")),
    }
}

fn arg_u64(call: &MoveCall, index: usize) -> Result<u64, LedgerError> {
    match arg(call, index) {
        Some(Argument::U64(v)) => Ok(*v),
        _ => Err(bad_arg(call, index, "u64")),
    }
}

fn arg_u8(call: &MoveCall, index: usize) -> Result<u8, LedgerError> {
    match arg(call, index) {
        Some(Argument::U8(v)) => Ok(*v),
        _ => Err(bad_arg(call, index, "u8")),
    }
}

fn arg_bytes(call: &MoveCall, index: usize) -> Result<&[u8], LedgerError> {
    match arg(call, index) {
        Some(Argument::Bytes(b)) => Ok(b),
        _ => Err(bad_arg(call, index, "vector<u8>")),
    }
}

fn arg_address(call: &MoveCall, index: usize) -> Result<&Address, LedgerError> {
    match arg(call, index) {
        Some(Argument::Address(a)) => Ok(a),
        _ => Err(bad_arg(call, index, "address")),
    }
}

fn arg_coin(call: &MoveCall, index: usize) -> Result<u64, LedgerError> {
    match arg(call, index) {
        Some(Argument::Coin(v)) => Ok(*v),
        _ => Err(bad_arg(call, index, "coin")),
    }
}

/// Whether `id` lies in the namespace of `object` (its bytes are a prefix).
fn in_namespace(object: &ObjectId, id: &[u8]) -> bool {
    PolicyId::from(object)
        .to_bytes()
        .is_ok_and(|ns| id.starts_with(&ns))
}

impl Execution<'_> {
    fn apply(&mut self, call: &MoveCall) -> Result<(), LedgerError> {
        let expected_package = match call.module.as_str() {
            ALLOWLIST_MODULE => &self.packages.allowlist,
            FILE_NFT_MODULE => &self.packages.file_nft,
            other => {
                return Err(LedgerError::InvalidTransaction(format!(
                    "unknown module {other}"
                )));
            }
        };
        if call.package.normalized() != expected_package.normalized() {
            return Err(LedgerError::InvalidTransaction(format!(
                "package {} does not publish {}",
                call.package, call.module
            )));
        }

        match (call.module.as_str(), call.function.as_str()) {
            (ALLOWLIST_MODULE, "create_allowlist_entry") => self.create_allowlist(call),
            (ALLOWLIST_MODULE, "add") => self.add_member(call),
            (ALLOWLIST_MODULE, "seal_approve") => self.approve_allowlist(call),
            (FILE_NFT_MODULE, "create_collection") => self.create_collection(call),
            (FILE_NFT_MODULE, "update_collection_metadata") => self.update_metadata(call),
            (FILE_NFT_MODULE, "mint_access_nft") => self.mint(call),
            (FILE_NFT_MODULE, "seal_approve") => self.approve_nft(call),
            _ => Err(LedgerError::InvalidTransaction(format!(
                "unknown function {}",
                call.target()
            ))),
        }
    }

    fn new_object(&mut self, package: &ObjectId, type_suffix: &str, fields: Value) -> ObjectId {
        let index = self.created.len() as u64;
        let mut hasher = Sha256::new();
        hasher.update(self.digest.as_bytes());
        hasher.update(index.to_le_bytes());
        let id = ObjectId::new(format!("0x{}", hex::encode(hasher.finalize())));
        let object_type = format!("{package}::{type_suffix}");

        self.state.objects.insert(
            id.clone(),
            LedgerObject {
                id: id.clone(),
                object_type: object_type.clone(),
                owner: self.sender.clone(),
                version: 1,
                fields: fields.as_object().cloned().unwrap_or_default(),
            },
        );
        self.created.push(CreatedObject {
            object_type,
            object_id: id.clone(),
        });
        id
    }

    fn object(&self, id: &ObjectId, type_suffix: &str) -> Result<&LedgerObject, LedgerError> {
        let obj = self
            .state
            .objects
            .get(id)
            .ok_or_else(|| LedgerError::ObjectNotFound(id.to_string()))?;
        if !obj.is_type(type_suffix) {
            return Err(LedgerError::InvalidTransaction(format!(
                "object {id} is not a {type_suffix}"
            )));
        }
        Ok(obj)
    }

    fn mutate(
        &mut self,
        id: &ObjectId,
        f: impl FnOnce(&mut serde_json::Map<String, Value>),
    ) -> Result<(), LedgerError> {
        let obj = self
            .state
            .objects
            .get_mut(id)
            .ok_or_else(|| LedgerError::ObjectNotFound(id.to_string()))?;
        f(&mut obj.fields);
        obj.version += 1;
        if !self.mutated.contains(id) {
            self.mutated.push(id.clone());
        }
        Ok(())
    }

    fn create_allowlist(&mut self, call: &MoveCall) -> Result<(), LedgerError> {
        let name = arg_string(call, 0)?.to_owned();
        let package = call.package.clone();
        let list_id = self.new_object(&package, ALLOWLIST_TYPE, json!({"name": name, "list": []}));
        self.new_object(&package, CAP_TYPE, json!({"allowlist_id": list_id}));
        Ok(())
    }

    fn add_member(&mut self, call: &MoveCall) -> Result<(), LedgerError> {
        let list_id = arg_object(call, 0)?.clone();
        let cap_id = arg_object(call, 1)?;
        let member = arg_address(call, 2)?.clone();

        let cap = self.object(cap_id, CAP_TYPE)?;
        if &cap.owner != self.sender {
            return Err(abort(call, AbortCode::ENotOwner));
        }
        if cap.opt_str_field("allowlist_id") != Some(list_id.as_str()) {
            return Err(abort(call, AbortCode::EInvalidCap));
        }
        let list = self.object(&list_id, ALLOWLIST_TYPE)?;
        let already = list
            .fields
            .get("list")
            .and_then(Value::as_array)
            .is_some_and(|l| l.iter().any(|a| a.as_str() == Some(member.as_str())));
        if already {
            return Err(abort(call, AbortCode::EDuplicate));
        }

        self.mutate(&list_id, |fields| {
            if let Some(Value::Array(l)) = fields.get_mut("list") {
                l.push(Value::String(member.to_string()));
            }
        })
    }

    fn approve_allowlist(&mut self, call: &MoveCall) -> Result<(), LedgerError> {
        let id = arg_bytes(call, 0)?;
        let list_id = arg_object(call, 1)?;
        let list = self.object(list_id, ALLOWLIST_TYPE)?;
        let member = list
            .fields
            .get("list")
            .and_then(Value::as_array)
            .is_some_and(|l| l.iter().any(|a| a.as_str() == Some(self.sender.as_str())));
        if !member || !in_namespace(list_id, id) {
            return Err(abort(call, AbortCode::ENoAccess));
        }
        Ok(())
    }

    fn create_collection(&mut self, call: &MoveCall) -> Result<(), LedgerError> {
        let name = arg_string(call, 0)?.to_owned();
        let max_supply = arg_u64(call, 1)?;
        let mint_price = arg_u64(call, 2)?;
        let package = call.package.clone();
        self.new_object(
            &package,
            COLLECTION_TYPE,
            json!({
                "name": name,
                "max_supply": max_supply,
                "mint_price": mint_price,
                "minted": 0,
                "proceeds": 0,
                "blob_id": null,
                "file_name": null,
                "file_size": null,
                "resource_type": null,
                "end_epoch": null,
            }),
        );
        Ok(())
    }

    fn update_metadata(&mut self, call: &MoveCall) -> Result<(), LedgerError> {
        let collection_id = arg_object(call, 0)?.clone();
        let blob_id = arg_string(call, 1)?.to_owned();
        let file_name = arg_string(call, 2)?.to_owned();
        let file_size = arg_u64(call, 3)?;
        let resource_type = arg_u8(call, 4)?;
        let end_epoch = arg_u64(call, 5)?;

        let collection = self.object(&collection_id, COLLECTION_TYPE)?;
        if &collection.owner != self.sender {
            return Err(abort(call, AbortCode::ENotOwner));
        }
        self.mutate(&collection_id, |fields| {
            fields.insert("blob_id".into(), json!(blob_id));
            fields.insert("file_name".into(), json!(file_name));
            fields.insert("file_size".into(), json!(file_size));
            fields.insert("resource_type".into(), json!(resource_type));
            fields.insert("end_epoch".into(), json!(end_epoch));
        })
    }

    fn mint(&mut self, call: &MoveCall) -> Result<(), LedgerError> {
        let collection_id = arg_object(call, 0)?.clone();
        let payment = arg_coin(call, 1)?;

        let collection = self.object(&collection_id, COLLECTION_TYPE)?;
        let minted = collection.u64_field("minted")?;
        let max_supply = collection.u64_field("max_supply")?;
        let price = collection.u64_field("mint_price")?;
        if minted >= max_supply {
            return Err(abort(call, AbortCode::ESoldOut));
        }
        if payment < price {
            return Err(abort(call, AbortCode::EInsufficientPayment));
        }

        self.mutate(&collection_id, |fields| {
            let proceeds = fields.get("proceeds").and_then(Value::as_u64).unwrap_or(0);
            fields.insert("minted".into(), json!(minted + 1));
            fields.insert("proceeds".into(), json!(proceeds + payment));
        })?;
        let package = call.package.clone();
        self.new_object(
            &package,
            ACCESS_NFT_TYPE,
            json!({"collection_id": collection_id}),
        );
        Ok(())
    }

    fn approve_nft(&mut self, call: &MoveCall) -> Result<(), LedgerError> {
        let id = arg_bytes(call, 0)?;
        let nft_id = arg_object(call, 1)?;
        let nft = self.object(nft_id, ACCESS_NFT_TYPE)?;
        if &nft.owner != self.sender {
            return Err(abort(call, AbortCode::ENotOwner));
        }
        let collection_id = ObjectId::new(nft.str_field("collection_id")?);
        if !in_namespace(&collection_id, id) {
            return Err(abort(call, AbortCode::ENoAccess));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn execute(&self, tx: SignedTransaction) -> Result<TransactionEffects, LedgerError> {
        let decoded = tx.verify()?;
        let mut guard = self.state.lock();
        let exec = self.run(guard.clone(), &tx.sender, &tx.kind_bytes, &decoded)?;

        let effects = TransactionEffects {
            digest: exec.digest,
            created: exec.created,
            mutated: exec.mutated,
        };
        *guard = exec.state;
        guard.transactions += 1;
        drop(guard);

        info!(
            digest = %effects.digest,
            sender = %tx.sender,
            created = effects.created.len(),
            "transaction executed"
        );
        Ok(effects)
    }

    async fn read_object(&self, id: &ObjectId) -> Result<LedgerObject, LedgerError> {
        self.state
            .lock()
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::ObjectNotFound(id.to_string()))
    }

    async fn owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> Result<Vec<LedgerObject>, LedgerError> {
        let mut found: Vec<LedgerObject> = self
            .state
            .lock()
            .objects
            .values()
            .filter(|o| &o.owner == owner && o.is_type(struct_type))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn dev_inspect(&self, kind_bytes: &[u8], sender: &Address) -> Result<(), LedgerError> {
        let tx = Transaction::from_kind_bytes(kind_bytes)?;
        let snapshot = self.state.lock().clone();
        let result = self.run(snapshot, sender, kind_bytes, &tx).map(|_| ());
        debug!(sender = %sender, ok = result.is_ok(), "dev inspect");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{access_nft_from_object, allowlist_members, collection_from_object};
    use crate::signer::AgentSigner;
    use crate::tx::{AccessControlTx, CollectionMetadata};
    use harbor_core::{BlobId, PolicyKind, ResourceType};

    struct Fixture {
        ledger: MemoryLedger,
        builder: AccessControlTx,
        owner: AgentSigner,
    }

    fn fixture() -> Fixture {
        let packages = PackageIds::default();
        Fixture {
            ledger: MemoryLedger::new(packages.clone()),
            builder: AccessControlTx::new(packages),
            owner: AgentSigner::generate(),
        }
    }

    impl Fixture {
        async fn allowlist(&self) -> (ObjectId, ObjectId) {
            let effects = self
                .ledger
                .sign_and_execute(&self.builder.create_allowlist("team"), &self.owner)
                .await
                .unwrap();
            (
                effects.require_created("Allowlist").unwrap(),
                effects.require_created("Cap").unwrap(),
            )
        }

        async fn collection(&self, max_supply: u64, price: u64) -> ObjectId {
            self.ledger
                .sign_and_execute(
                    &self.builder.create_collection("c", max_supply, price),
                    &self.owner,
                )
                .await
                .unwrap()
                .require_created("Collection")
                .unwrap()
        }
    }

    fn abort_code(err: &LedgerError) -> Option<AbortCode> {
        err.abort_code()
    }

    #[tokio::test]
    async fn allowlist_membership_controls_approval() {
        let f = fixture();
        let (list, cap) = f.allowlist().await;
        let policy = PolicyId::from(&list);
        let approve = f
            .builder
            .approve(PolicyKind::Allowlist, &policy, &list)
            .unwrap()
            .to_kind_bytes()
            .unwrap();

        let err = f
            .ledger
            .dev_inspect(&approve, f.owner.address())
            .await
            .unwrap_err();
        assert_eq!(abort_code(&err), Some(AbortCode::ENoAccess));

        f.ledger
            .sign_and_execute(
                &f.builder.add_member(&list, &cap, f.owner.address()),
                &f.owner,
            )
            .await
            .unwrap();
        f.ledger
            .dev_inspect(&approve, f.owner.address())
            .await
            .unwrap();

        let obj = f.ledger.read_object(&list).await.unwrap();
        assert_eq!(allowlist_members(&obj).unwrap(), vec![f.owner.address().clone()]);
    }

    #[tokio::test]
    async fn approval_for_other_policy_is_denied() {
        let f = fixture();
        let (list, cap) = f.allowlist().await;
        f.ledger
            .sign_and_execute(
                &f.builder.add_member(&list, &cap, f.owner.address()),
                &f.owner,
            )
            .await
            .unwrap();

        let approve = f
            .builder
            .approve(PolicyKind::Allowlist, &PolicyId::new("0xA1"), &list)
            .unwrap()
            .to_kind_bytes()
            .unwrap();
        let err = f
            .ledger
            .dev_inspect(&approve, f.owner.address())
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn duplicate_member_and_foreign_cap_abort() {
        let f = fixture();
        let (list, cap) = f.allowlist().await;
        let (_other_list, other_cap) = f.allowlist().await;
        let member = AgentSigner::generate().address().clone();

        f.ledger
            .sign_and_execute(&f.builder.add_member(&list, &cap, &member), &f.owner)
            .await
            .unwrap();
        let dup = f
            .ledger
            .sign_and_execute(&f.builder.add_member(&list, &cap, &member), &f.owner)
            .await
            .unwrap_err();
        assert_eq!(abort_code(&dup), Some(AbortCode::EDuplicate));

        let bad_cap = f
            .ledger
            .sign_and_execute(&f.builder.add_member(&list, &other_cap, &member), &f.owner)
            .await
            .unwrap_err();
        assert_eq!(abort_code(&bad_cap), Some(AbortCode::EInvalidCap));

        let stranger = AgentSigner::generate();
        let not_owner = f
            .ledger
            .sign_and_execute(&f.builder.add_member(&list, &cap, &member), &stranger)
            .await
            .unwrap_err();
        assert_eq!(abort_code(&not_owner), Some(AbortCode::ENotOwner));
    }

    #[tokio::test]
    async fn failed_transaction_commits_nothing() {
        let f = fixture();
        let collection = f.collection(1, 0).await;
        let before = f.ledger.transaction_count();

        let mut tx = f.builder.create_collection("second", 1, 0);
        tx.calls.extend(f.builder.mint_access_nft(&collection, 0).calls);
        tx.calls.extend(f.builder.mint_access_nft(&collection, 0).calls);
        let err = f.ledger.sign_and_execute(&tx, &f.owner).await.unwrap_err();

        assert_eq!(abort_code(&err), Some(AbortCode::ESoldOut));
        assert_eq!(f.ledger.transaction_count(), before);
        assert_eq!(f.ledger.count_of_type(COLLECTION_TYPE), 1);
        assert_eq!(f.ledger.count_of_type(ACCESS_NFT_TYPE), 0);
    }

    #[tokio::test]
    async fn mint_checks_payment_and_supply() {
        let f = fixture();
        let collection = f.collection(1, 1_000_000).await;
        let buyer = AgentSigner::generate();

        let cheap = f
            .ledger
            .sign_and_execute(&f.builder.mint_access_nft(&collection, 10), &buyer)
            .await
            .unwrap_err();
        assert_eq!(abort_code(&cheap), Some(AbortCode::EInsufficientPayment));

        let effects = f
            .ledger
            .sign_and_execute(&f.builder.mint_access_nft(&collection, 1_000_000), &buyer)
            .await
            .unwrap();
        let nft_id = effects.require_created("AccessNFT").unwrap();
        let nft = access_nft_from_object(&f.ledger.read_object(&nft_id).await.unwrap()).unwrap();
        assert_eq!(&nft.owner, buyer.address());
        assert_eq!(nft.collection_id, collection);

        let sold_out = f
            .ledger
            .sign_and_execute(&f.builder.mint_access_nft(&collection, 1_000_000), &buyer)
            .await
            .unwrap_err();
        assert_eq!(abort_code(&sold_out), Some(AbortCode::ESoldOut));

        let owned = f
            .ledger
            .owned_objects(buyer.address(), ACCESS_NFT_TYPE)
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);
    }

    #[tokio::test]
    async fn nft_approval_requires_ownership() {
        let f = fixture();
        let collection = f.collection(5, 0).await;
        let nft_id = f
            .ledger
            .sign_and_execute(&f.builder.mint_access_nft(&collection, 0), &f.owner)
            .await
            .unwrap()
            .require_created("AccessNFT")
            .unwrap();

        let approve = f
            .builder
            .approve(PolicyKind::MintGated, &PolicyId::from(&collection), &nft_id)
            .unwrap()
            .to_kind_bytes()
            .unwrap();
        f.ledger
            .dev_inspect(&approve, f.owner.address())
            .await
            .unwrap();

        let thief = AgentSigner::generate();
        let err = f
            .ledger
            .dev_inspect(&approve, thief.address())
            .await
            .unwrap_err();
        assert_eq!(abort_code(&err), Some(AbortCode::ENotOwner));
    }

    #[tokio::test]
    async fn metadata_update_is_owner_only() {
        let f = fixture();
        let collection = f.collection(5, 0).await;
        let metadata = CollectionMetadata {
            blob_id: BlobId::new("blob"),
            file_name: "a.txt".into(),
            file_size: 3,
            resource_type: ResourceType::File,
            end_epoch: 4,
        };
        let tx = f.builder.update_collection_metadata(&collection, &metadata);

        let err = f
            .ledger
            .sign_and_execute(&tx, &AgentSigner::generate())
            .await
            .unwrap_err();
        assert_eq!(abort_code(&err), Some(AbortCode::ENotOwner));

        let effects = f.ledger.sign_and_execute(&tx, &f.owner).await.unwrap();
        assert_eq!(effects.mutated, vec![collection.clone()]);
        let info =
            collection_from_object(&f.ledger.read_object(&collection).await.unwrap()).unwrap();
        assert!(info.is_provisioned());
        assert_eq!(info.file_name.as_deref(), Some("a.txt"));
    }

    #[tokio::test]
    async fn dev_inspect_does_not_commit() {
        let f = fixture();
        let kind = f.builder.create_collection("x", 1, 0).to_kind_bytes().unwrap();
        f.ledger.dev_inspect(&kind, f.owner.address()).await.unwrap();
        assert_eq!(f.ledger.count_of_type(COLLECTION_TYPE), 0);
        assert_eq!(f.ledger.transaction_count(), 0);
    }

    #[tokio::test]
    async fn wrong_package_is_rejected() {
        let f = fixture();
        let builder = AccessControlTx::new(PackageIds::new("0xdead", "0xbeef"));
        let err = f
            .ledger
            .sign_and_execute(&builder.create_allowlist("x"), &f.owner)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransaction(_)));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let f = fixture();
        let err = f.ledger.read_object(&ObjectId::new("0x99")).await.unwrap_err();
        assert!(matches!(err, LedgerError::ObjectNotFound(_)));
    }
}

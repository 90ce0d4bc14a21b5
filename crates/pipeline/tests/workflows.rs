mod support;

use bytes::Bytes;
use harbor_blob::BlobStore;
use harbor_core::{
    Address, Caller, ErrorKind, ObjectId, PolicyId, ResourceType, RetentionParams,
    WorkflowOutcome,
};
use harbor_ledger::{AgentSigner, COLLECTION_TYPE, LedgerClient};
use harbor_pipeline::{CollectionSpec, MemoryStore, MintGatedStore, MintRetrieveReceipt};
use harbor_staging::DownloadStore;
use serde_json::json;

use support::{Harness, HarnessOptions, harness, harness_with};

fn spec(name: &str) -> CollectionSpec {
    CollectionSpec {
        name: name.into(),
        max_supply: 10,
        mint_price: 0,
    }
}

fn mint_request(resource_type: ResourceType, file_name: &str) -> MintGatedStore {
    MintGatedStore {
        collection: spec("test collection"),
        file_name: file_name.into(),
        resource_type,
        retention: RetentionParams::default(),
    }
}

async fn own_allowlist(h: &Harness) -> PolicyId {
    let receipt = h
        .pipeline
        .create_allowlist("team")
        .await
        .into_result()
        .unwrap();
    PolicyId::from(&receipt.allowlist_id)
}

fn kind_of<T>(outcome: &WorkflowOutcome<T>) -> Option<ErrorKind> {
    match outcome {
        WorkflowOutcome::Success(_) => None,
        WorkflowOutcome::Failure(e) => Some(e.kind()),
    }
}

#[tokio::test]
async fn store_hello_under_fixed_policy_then_retrieve() {
    let h = harness().await;
    let me: Address = h.signer.address().clone();
    h.ledger
        .seed_allowlist(ObjectId::new("0xA1"), &me, std::slice::from_ref(&me));
    let policy = PolicyId::new("0xA1");

    let receipt = h
        .pipeline
        .store_with_allowlist(
            Bytes::from_static(b"hello"),
            &policy,
            RetentionParams::new(true, 3),
        )
        .await
        .into_result()
        .unwrap();
    assert!(!receipt.blob_id.as_str().is_empty());
    assert_eq!(receipt.size, 5);

    let stored = h.blobs.read_blob(&receipt.blob_id).await.unwrap();
    assert_ne!(&stored[..], b"hello");

    let plaintext = h
        .pipeline
        .retrieve_with_allowlist(&receipt.blob_id, &policy)
        .await
        .into_result()
        .unwrap();
    assert_eq!(&plaintext[..], b"hello");
}

#[tokio::test]
async fn round_trip_through_created_allowlist() {
    let h = harness().await;
    let policy = own_allowlist(&h).await;

    for payload in [&b""[..], b"x", &[0u8; 4096][..]] {
        let receipt = h
            .pipeline
            .store_with_allowlist(
                Bytes::copy_from_slice(payload),
                &policy,
                RetentionParams::default(),
            )
            .await
            .into_result()
            .unwrap();
        let plaintext = h
            .pipeline
            .retrieve_with_allowlist(&receipt.blob_id, &policy)
            .await
            .into_result()
            .unwrap();
        assert_eq!(&plaintext[..], payload);
    }
    assert_eq!(h.pipeline.metrics().snapshot().retrieves, 3);
}

#[tokio::test]
async fn retrieve_without_membership_is_authorization_error() {
    let h = harness().await;
    let stranger = AgentSigner::generate();
    h.ledger.seed_allowlist(
        ObjectId::new("0xb0b"),
        stranger.address(),
        &[stranger.address().clone()],
    );
    let policy = PolicyId::new("0xb0b");

    let receipt = h
        .pipeline
        .store_with_allowlist(Bytes::from_static(b"secret"), &policy, RetentionParams::default())
        .await
        .into_result()
        .unwrap();
    let outcome = h
        .pipeline
        .retrieve_with_allowlist(&receipt.blob_id, &policy)
        .await;

    assert!(!outcome.is_success());
    assert!(outcome.error().unwrap().contains("Authorization"));
    assert_eq!(kind_of(&outcome), Some(ErrorKind::Authorization));
    let value = serde_json::to_value(&outcome.map(|b| b.len())).unwrap();
    assert_eq!(value["success"], json!(false));
}

#[tokio::test]
async fn proof_for_other_policy_never_yields_plaintext() {
    let h = harness().await;
    let k1 = own_allowlist(&h).await;
    let k2 = own_allowlist(&h).await;

    let receipt = h
        .pipeline
        .store_with_allowlist(Bytes::from_static(b"for k1"), &k1, RetentionParams::default())
        .await
        .into_result()
        .unwrap();

    let outcome = h
        .pipeline
        .retrieve_with_allowlist(&receipt.blob_id, &k2)
        .await;
    assert_eq!(kind_of(&outcome), Some(ErrorKind::Authorization));
}

#[tokio::test]
async fn missing_blob_is_not_found() {
    let h = harness().await;
    let policy = own_allowlist(&h).await;
    let outcome = h
        .pipeline
        .retrieve_with_allowlist(&"no-such-blob".into(), &policy)
        .await;
    assert_eq!(kind_of(&outcome), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn invalid_retention_is_rejected_before_encrypting() {
    let h = harness().await;
    let policy = own_allowlist(&h).await;
    let outcome = h
        .pipeline
        .store_with_allowlist(Bytes::from_static(b"x"), &policy, RetentionParams::new(true, 0))
        .await;
    assert_eq!(kind_of(&outcome), Some(ErrorKind::InvalidRequest));
    assert_eq!(h.blobs.writes(), 0);
}

#[tokio::test]
async fn encrypt_failure_writes_no_blob() {
    let h = harness_with(HarnessOptions {
        fail_encrypt: true,
        ..HarnessOptions::default()
    })
    .await;

    let outcome = h
        .pipeline
        .mint_gated_store(
            Bytes::from_static(b"data"),
            mint_request(ResourceType::File, "a.txt"),
        )
        .await;
    assert_eq!(kind_of(&outcome), Some(ErrorKind::Encryption));
    assert_eq!(h.blobs.writes(), 0);
}

#[tokio::test]
async fn write_failure_leaves_orphaned_collection() {
    let h = harness_with(HarnessOptions {
        fail_writes: true,
        ..HarnessOptions::default()
    })
    .await;

    let outcome = h
        .pipeline
        .mint_gated_store(
            Bytes::from_static(b"data"),
            mint_request(ResourceType::File, "a.txt"),
        )
        .await;
    assert!(!outcome.is_success());
    assert_eq!(kind_of(&outcome), Some(ErrorKind::Storage));
    assert_eq!(h.blobs.writes(), 1);

    // The collection from step 1 is still there, without content.
    assert_eq!(h.ledger.count_of_type(COLLECTION_TYPE), 1);
    let owned = h
        .ledger
        .owned_objects(h.signer.address(), COLLECTION_TYPE)
        .await
        .unwrap();
    let info = harbor_ledger::collection_from_object(&owned[0]).unwrap();
    assert!(!info.is_provisioned());
    assert_eq!(h.pipeline.metrics().snapshot().orphaned_collections, 1);
}

#[tokio::test]
async fn unreadable_collection_id_counts_as_orphan() {
    let h = harness_with(HarnessOptions {
        drop_created_effects: true,
        ..HarnessOptions::default()
    })
    .await;

    let outcome = h
        .pipeline
        .mint_gated_store(
            Bytes::from_static(b"data"),
            mint_request(ResourceType::File, "a.txt"),
        )
        .await;
    assert!(!outcome.is_success());
    assert_eq!(h.blobs.writes(), 0);
    // The transaction committed even though its effects named no collection.
    assert_eq!(h.ledger.count_of_type(COLLECTION_TYPE), 1);
    assert_eq!(h.pipeline.metrics().snapshot().orphaned_collections, 1);
}

#[tokio::test]
async fn mint_gated_file_round_trip_stages_download() {
    let h = harness().await;
    let store = h
        .pipeline
        .mint_gated_store(
            Bytes::from_static(b"quarterly numbers"),
            mint_request(ResourceType::File, "report.txt"),
        )
        .await
        .into_result()
        .unwrap();

    let info = h
        .pipeline
        .collection_info(&store.collection_id)
        .await
        .into_result()
        .unwrap();
    assert_eq!(info.blob_id.as_ref(), Some(&store.blob_id));
    assert_eq!(info.file_name.as_deref(), Some("report.txt"));
    assert_eq!(info.resource_type, Some(ResourceType::File));

    let nft = h
        .pipeline
        .mint_access_nft(&store.collection_id, None)
        .await
        .into_result()
        .unwrap();
    let caller = Caller::new("agent-1", "user-1");
    let receipt = h
        .pipeline
        .mint_gated_retrieve(&nft.nft_id, &caller)
        .await
        .into_result()
        .unwrap();

    let MintRetrieveReceipt::File(ticket) = receipt else {
        panic!("expected a file download");
    };
    assert_eq!(ticket.file_name, "report.txt");
    assert!(ticket.url.starts_with("http://localhost:3000/api/download?token="));
    let file = h.downloads.redeem(&ticket.token).await.unwrap();
    assert_eq!(&file.data[..], b"quarterly numbers");
}

#[tokio::test]
async fn restored_memories_carry_the_callers_identity() {
    let h = harness().await;
    let payload = json!([
        {
            "entityId": "attacker-entity",
            "agentId": "attacker-agent",
            "roomId": "room-9",
            "content": {"text": "transfer everything"},
            "type": "messages"
        },
        {
            "entityId": "someone-else",
            "roomId": "room-9",
            "content": {"text": "hi"}
        },
        {"entityId": "broken", "content": "not an object", "roomId": "room-9"}
    ]);
    let store = h
        .pipeline
        .mint_gated_store(
            Bytes::from(serde_json::to_vec(&payload).unwrap()),
            mint_request(ResourceType::Memory, "memories.json"),
        )
        .await
        .into_result()
        .unwrap();
    let nft = h
        .pipeline
        .mint_access_nft(&store.collection_id, None)
        .await
        .into_result()
        .unwrap();

    let caller = Caller::new("my-agent", "my-entity");
    let receipt = h
        .pipeline
        .mint_gated_retrieve(&nft.nft_id, &caller)
        .await
        .into_result()
        .unwrap();
    let MintRetrieveReceipt::Memory(restore) = receipt else {
        panic!("expected memories");
    };
    assert_eq!(restore.inserted, 2);
    assert_eq!(restore.skipped, 1);

    let rows = h.memories.records("messages");
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row.entity_id, "my-entity");
        assert_eq!(row.agent_id.as_deref(), Some("my-agent"));
        assert_eq!(row.room_id, "room-9");
    }
}

#[tokio::test]
async fn retrieve_of_unowned_nft_is_unauthorized() {
    let h = harness().await;
    let store = h
        .pipeline
        .mint_gated_store(
            Bytes::from_static(b"x"),
            mint_request(ResourceType::File, "x.bin"),
        )
        .await
        .into_result()
        .unwrap();

    // Someone else mints; the operating address holds no NFT.
    let other = AgentSigner::generate();
    let effects = h
        .ledger
        .sign_and_execute(
            &h.pipeline
                .transactions()
                .mint_access_nft(&store.collection_id, 0),
            &other,
        )
        .await
        .unwrap();
    let foreign_nft = effects.require_created("AccessNFT").unwrap();

    let outcome = h
        .pipeline
        .mint_gated_retrieve(&foreign_nft, &Caller::new("a", "e"))
        .await;
    assert_eq!(kind_of(&outcome), Some(ErrorKind::Authorization));
}

#[tokio::test]
async fn memories_round_trip_through_allowlist() {
    let h = harness().await;
    let policy = own_allowlist(&h).await;
    let caller = Caller::new("agent-1", "entity-1").with_room("room-1");
    for text in ["first", "second"] {
        h.memories
            .insert(
                "messages",
                serde_json::from_value(json!({
                    "entityId": "entity-1",
                    "agentId": "agent-1",
                    "roomId": "room-1",
                    "content": {"text": text}
                }))
                .unwrap(),
            )
            .await
            .unwrap();
    }

    let stored = h
        .pipeline
        .store_memories(
            &caller,
            "messages",
            harbor_pipeline::MemoryTarget::Allowlist {
                policy_id: policy.clone(),
                retention: RetentionParams::default(),
            },
        )
        .await
        .into_result()
        .unwrap();
    assert_eq!(stored.record_count, 2);
    assert!(stored.collection.is_none());

    let restorer = Caller::new("agent-2", "entity-2");
    let restore = h
        .pipeline
        .retrieve_memories_with_allowlist(&stored.blob_id, &policy, &restorer)
        .await
        .into_result()
        .unwrap();
    assert_eq!(restore.inserted, 2);
    let rows = h.memories.records("messages");
    assert_eq!(rows.len(), 4);
    assert!(
        rows[2..]
            .iter()
            .all(|r| r.entity_id == "entity-2" && r.agent_id.as_deref() == Some("agent-2"))
    );
}

#[tokio::test]
async fn storing_an_empty_room_is_rejected() {
    let h = harness().await;
    let policy = own_allowlist(&h).await;
    let outcome = h
        .pipeline
        .store_memories(
            &Caller::new("a", "e").with_room("empty"),
            "messages",
            harbor_pipeline::MemoryTarget::Allowlist {
                policy_id: policy,
                retention: RetentionParams::default(),
            },
        )
        .await;
    assert_eq!(kind_of(&outcome), Some(ErrorKind::InvalidRequest));
    assert_eq!(h.blobs.writes(), 0);
}

#[tokio::test]
async fn serialized_mint_stores_all_complete() {
    let h = harness_with(HarnessOptions {
        serialize_mint_store: true,
        ..HarnessOptions::default()
    })
    .await;
    let (a, b) = tokio::join!(
        h.pipeline.mint_gated_store(
            Bytes::from_static(b"a"),
            mint_request(ResourceType::File, "a.txt")
        ),
        h.pipeline.mint_gated_store(
            Bytes::from_static(b"b"),
            mint_request(ResourceType::File, "b.txt")
        ),
    );
    assert!(a.is_success() && b.is_success());
    assert_eq!(h.ledger.count_of_type(COLLECTION_TYPE), 2);
    assert_eq!(h.pipeline.metrics().snapshot().mint_stores, 2);
}

mod common;

use bson::{Bson, DateTime, doc};
use serde_json::json;

use treelayer_core::{
    backend::{SaveOptions, StorageDriver, StorageDriverBuilder},
    error::DocumentStoreError,
    query::{Operator, Query},
    snapshot::TreeSnapshot,
};
use treelayer_memory::InMemoryStorage;

use common::{at, ids, storage_with_stepping_clock};

async fn seeded() -> InMemoryStorage {
    let storage = storage_with_stepping_clock().await;

    storage
        .save(
            "restaurants",
            doc! { "id": "r1", "name": "R1", "opened": DateTime::from_millis(1_600_000_000_000_i64), "tags": ["a", 1, 2.5, Bson::Null] },
            SaveOptions::default(),
        )
        .await
        .unwrap();
    storage
        .save("restaurants/r1/comments", doc! { "id": "c1", "text": "good" }, SaveOptions::default())
        .await
        .unwrap();
    storage
        .save("restaurants/r2/comments", doc! { "id": "c2", "text": "bad" }, SaveOptions::default())
        .await
        .unwrap();

    storage
}

#[tokio::test]
async fn test_export_import_round_trip() {
    let source = seeded().await;
    let snapshot = source.export(None).await.unwrap();

    let target = InMemoryStorage::new();
    target.import(snapshot.clone()).await.unwrap();

    assert_eq!(target.export(None).await.unwrap(), snapshot);
    assert_eq!(
        target.find_by_id("restaurants", "r1").await.unwrap(),
        source.find_by_id("restaurants", "r1").await.unwrap()
    );

    // Through JSON text as well.
    let text = snapshot.to_json_string().unwrap();
    let reparsed = TreeSnapshot::from_json_str(&text).unwrap();
    let from_text = InMemoryStorage::new();
    from_text.import(reparsed).await.unwrap();
    assert_eq!(from_text.export(None).await.unwrap(), snapshot);
}

#[tokio::test]
async fn test_export_tags_dates_and_keeps_containers() {
    let storage = seeded().await;
    let snapshot = storage.export(None).await.unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();

    let r1 = &json["collections"]["restaurants"]["documents"]["r1"];
    assert_eq!(
        r1["data"]["opened"],
        json!({ "__instance": "date", "value": "2020-09-13T12:26:40.000Z" })
    );
    assert_eq!(r1["data"]["tags"], json!(["a", 1, 2.5, null]));
    assert_eq!(r1["createdAt"], json!(at(1_000_000)));

    // r2 only exists as the parent of its comments.
    let r2 = &json["collections"]["restaurants"]["documents"]["r2"];
    assert_eq!(r2["data"], json!(null));
    assert_eq!(r2["createdAt"], json!(null));
    assert!(r2["collections"]["comments"]["documents"]["c2"]["data"].is_object());
}

#[tokio::test]
async fn test_subtree_export() {
    let storage = seeded().await;

    let subtree = storage.export(Some("restaurants/r1")).await.unwrap();
    assert_eq!(subtree.data.as_ref().unwrap()["name"], json!("R1"));
    assert_eq!(subtree.node_count(), 2);

    let missing = storage.export(Some("restaurants/nope")).await.unwrap();
    assert_eq!(missing, TreeSnapshot::default());
    assert!(
        storage
            .export(None)
            .await
            .unwrap()
            .collections["restaurants"]
            .documents
            .get("nope")
            .is_none()
    );
}

#[tokio::test]
async fn test_import_accepts_legacy_timestamps() {
    let snapshot = TreeSnapshot::from_json_str(
        &json!({
            "collections": {
                "events": {
                    "documents": {
                        "e1": {
                            "data": { "at": { "_seconds": 1_600_000_000, "_nanoseconds": 0 }, "n": 1 },
                            "createdAt": "2020-01-01T00:00:00Z",
                            "updatedAt": "2020-01-02T00:00:00Z"
                        }
                    }
                }
            }
        })
        .to_string(),
    )
    .unwrap();

    let storage = InMemoryStorage::new();
    storage.import(snapshot).await.unwrap();

    let event = storage.find_by_id("events", "e1").await.unwrap().unwrap();
    assert_eq!(
        event.data,
        doc! { "at": DateTime::from_millis(1_600_000_000_000_i64), "n": 1_i64 }
    );
    assert!(event.updated_at > event.created_at);

    let exported = serde_json::to_value(storage.export(None).await.unwrap()).unwrap();
    assert_eq!(
        exported["collections"]["events"]["documents"]["e1"]["data"]["at"]["__instance"],
        json!("date")
    );
}

#[tokio::test]
async fn test_import_replaces_the_tree() {
    let storage = seeded().await;

    let replacement = InMemoryStorage::new();
    replacement
        .save("other", doc! { "id": "o1" }, SaveOptions::default())
        .await
        .unwrap();
    storage
        .import(replacement.export(None).await.unwrap())
        .await
        .unwrap();

    assert!(storage.query("restaurants", Query::new()).await.unwrap().is_empty());
    assert_eq!(
        ids(&storage.query("other", Query::new()).await.unwrap()),
        ["o1"]
    );
}

#[tokio::test]
async fn test_failed_import_keeps_previous_tree() {
    let storage = seeded().await;
    let before = storage.export(None).await.unwrap();

    let broken = TreeSnapshot::from_json_str(
        &json!({
            "collections": { "x": { "documents": { "1": {
                "data": { "when": { "__instance": "date", "value": "not a date" } }
            } } } }
        })
        .to_string(),
    )
    .unwrap();

    let err = storage.import(broken).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Serialization(_)));
    assert_eq!(storage.export(None).await.unwrap(), before);
}

#[tokio::test]
async fn test_builder_seeds_from_snapshot() {
    let snapshot = seeded().await.export(None).await.unwrap();

    let storage = InMemoryStorage::builder()
        .with_snapshot(snapshot)
        .build()
        .await
        .unwrap();

    let comments = storage
        .query("restaurants/r1/comments", Query::new())
        .await
        .unwrap();
    assert_eq!(ids(&comments), ["c1"]);
}

#[tokio::test]
async fn test_import_rejects_out_of_range_timestamps() {
    let storage = seeded().await;
    let before = storage.export(None).await.unwrap();

    let snapshot = TreeSnapshot::from_json_str(
        &json!({
            "collections": { "events": { "documents": { "e1": {
                "data": { "at": { "_seconds": i64::MAX, "_nanoseconds": 0 } }
            } } } }
        })
        .to_string(),
    )
    .unwrap();

    let err = storage.import(snapshot).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Serialization(_)));
    assert_eq!(storage.export(None).await.unwrap(), before);
}

#[tokio::test]
async fn test_timestamp_shaped_maps_import_as_dates() {
    let source = InMemoryStorage::new();
    source
        .save(
            "events",
            doc! { "id": "e1", "at": { "_seconds": 1_i64, "_nanoseconds": 0_i64 } },
            SaveOptions::default(),
        )
        .await
        .unwrap();

    // Stored as written.
    let stored = source.find_by_id("events", "e1").await.unwrap().unwrap();
    assert!(stored.data.get_document("at").is_ok());

    let target = InMemoryStorage::new();
    target.import(source.export(None).await.unwrap()).await.unwrap();

    let imported = target.find_by_id("events", "e1").await.unwrap().unwrap();
    assert_eq!(imported.data, doc! { "at": DateTime::from_millis(1_000) });

    // Both shapes still match the same instant.
    let query = Query::builder()
        .filter("at", Operator::Eq, DateTime::from_millis(1_000))
        .build();
    assert_eq!(ids(&source.query("events", query.clone()).await.unwrap()), ["e1"]);
    assert_eq!(ids(&target.query("events", query).await.unwrap()), ["e1"]);
}

mod common;

use bson::doc;

use treelayer_core::{
    backend::{SaveOptions, StorageDriver},
    query::{Operator, Query, SortDirection},
};
use treelayer_memory::InMemoryStorage;

use common::ids;

async fn seeded() -> InMemoryStorage {
    let storage = InMemoryStorage::new();

    let writes = [
        ("accounts/a1/locations", doc! { "id": "l1", "city": "Oslo", "size": 3 }),
        ("accounts/a1/locations", doc! { "id": "l2", "city": "Rome", "size": 1 }),
        ("accounts/a2/locations", doc! { "id": "l3", "city": "Oslo", "size": 2 }),
        ("accounts/a2/sites", doc! { "id": "s1", "city": "Oslo" }),
        ("regions/north/accounts/a3/locations", doc! { "id": "l4", "city": "Tromso", "size": 5 }),
    ];
    for (path, data) in writes {
        storage.save(path, data, SaveOptions::default()).await.unwrap();
    }

    storage
}

#[tokio::test]
async fn test_group_query_spans_every_parent() {
    let storage = seeded().await;

    let records = storage.group_query("locations", Query::new()).await.unwrap();
    assert_eq!(ids(&records), ["l1", "l2", "l3", "l4"]);

    let paths = records
        .iter()
        .map(|record| record.raw_path.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        [
            "accounts/a1/locations/l1",
            "accounts/a1/locations/l2",
            "accounts/a2/locations/l3",
            "regions/north/accounts/a3/locations/l4",
        ]
    );
}

#[tokio::test]
async fn test_group_query_applies_predicates_and_ordering() {
    let storage = seeded().await;

    let records = storage
        .group_query(
            "locations",
            Query::builder()
                .filter("city", Operator::Eq, "Oslo")
                .order_by("size", SortDirection::Asc)
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(ids(&records), ["l3", "l1"]);

    let records = storage
        .group_query(
            "locations",
            Query::builder()
                .order_by("size", SortDirection::Desc)
                .limit(2)
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(ids(&records), ["l4", "l1"]);
}

#[tokio::test]
async fn test_group_query_matches_name_only() {
    let storage = seeded().await;

    let sites = storage.group_query("sites", Query::new()).await.unwrap();
    assert_eq!(ids(&sites), ["s1"]);

    // Container-only documents are not results.
    let accounts = storage.group_query("accounts", Query::new()).await.unwrap();
    assert!(accounts.is_empty());

    storage
        .save("accounts", doc! { "id": "a1", "plan": "pro" }, SaveOptions::default())
        .await
        .unwrap();
    storage
        .save("regions/north/accounts", doc! { "id": "a3", "plan": "free" }, SaveOptions::default())
        .await
        .unwrap();

    // Top-level and nested collections with the same name both match.
    let accounts = storage.group_query("accounts", Query::new()).await.unwrap();
    assert_eq!(ids(&accounts), ["a1", "a3"]);

    assert!(storage.group_query("missing", Query::new()).await.unwrap().is_empty());
}

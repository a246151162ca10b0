//! Runs against a real DynamoDB endpoint (e.g. `AWS_PROFILE=localstack`).
//!
//! `cargo test -- --ignored`

use rusty_ulid::Ulid;
use serial_test::serial;

use balerial_dynamo::setup::create_table;
use balerial_dynamo::{DynamoStore, QueryOptions, Repository, Scalar, SortQuery, StoreConfig};

mod helpers;
use helpers::*;

const TABLE: &str = "tests_balerial_orders";

async fn repository() -> Repository<TestOrder> {
    let store = DynamoStore::connect(&StoreConfig::from_env()).await;
    let table = orders_table(TABLE);
    create_table(&store, &table).await.unwrap();
    Repository::new(store, table)
}

fn unique_orders(status: &str, count: u64) -> Vec<TestOrder> {
    (1..=count)
        .map(|timestamp| TestOrder::new(Ulid::generate().to_string(), status, timestamp))
        .collect()
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_put_get_and_index_read() {
    let repo = repository().await;
    let status = format!("pending-{}", Ulid::generate());
    let records = unique_orders(&status, 30);

    repo.batch_put(&records).await.unwrap();
    wait_for_consistency().await;

    let got = repo
        .get_by_index(Some("byStatus"), status.as_str(), &QueryOptions::default())
        .await
        .unwrap();
    let timestamps: Vec<u64> = got.iter().map(|order| order.timestamp).collect();
    assert_eq!(timestamps, (1..=30).rev().collect::<Vec<_>>());

    let first = repo
        .get_by_index_paginated(Some("byStatus"), status.as_str(), None, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(first.elements.len(), 25);
    let second = repo
        .get_by_index_paginated(Some("byStatus"), status.as_str(), first.end_key, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(second.elements.len(), 5);
    assert!(second.end_key.is_none());

    let options = QueryOptions::default().sort(SortQuery::between(5_u64, 9_u64));
    let got = repo
        .get_by_index(Some("byStatus"), status.as_str(), &options)
        .await
        .unwrap();
    assert_eq!(got.len(), 5);

    let record = &records[0];
    assert_eq!(repo.get(record.uuid.as_str(), None).await.unwrap().as_ref(), Some(record));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_update_and_key_swap() {
    let repo = repository().await;
    let old = TestOrder::new(Ulid::generate().to_string(), "pending", 1);
    repo.put(&old).await.unwrap();

    repo.update_fields(old.uuid.as_str(), &serde_json::json!({ "status": "done" }), None)
        .await
        .unwrap();
    let updated = repo.get(old.uuid.as_str(), None).await.unwrap().unwrap();
    assert_eq!(updated.status, "done");

    let mut new = updated.clone();
    new.uuid = Ulid::generate().to_string();
    repo.update_full_object(&updated, &new).await.unwrap();

    assert_eq!(repo.get(old.uuid.as_str(), None).await.unwrap(), None);
    assert_eq!(repo.get(new.uuid.as_str(), None).await.unwrap(), Some(new.clone()));

    repo.delete(new.uuid.as_str(), None).await.unwrap();
    assert_eq!(repo.get(new.uuid.as_str(), None).await.unwrap(), None);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_batch_delete() {
    let repo = repository().await;
    let records = unique_orders("batch-delete", 30);
    repo.batch_put(&records).await.unwrap();

    let keys: Vec<(Scalar, Option<Scalar>)> = records
        .iter()
        .map(|order| (order.uuid.as_str().into(), None))
        .collect();
    repo.batch_delete(&keys).await.unwrap();

    for record in &records {
        assert_eq!(repo.get(record.uuid.as_str(), None).await.unwrap(), None);
    }
}

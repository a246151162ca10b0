use balerial_dynamo::{
    Error, FilterElement, FilterExpression, MemoryStore, Operation, QueryOptions, RepositoryConfig,
    ScanOptions, SortQuery, StoreError, TableDescriptor,
};

mod helpers;
use helpers::*;

fn timestamps(orders: &[TestOrder]) -> Vec<u64> {
    orders.iter().map(|order| order.timestamp).collect()
}

#[tokio::test]
async fn test_get_by_index_returns_all_descending() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    for order in orders("pending", 30) {
        repo.put(&order).await.unwrap();
    }
    repo.put(&TestOrder::new("order-done", "done", 99)).await.unwrap();

    let got = repo
        .get_by_index(Some("byStatus"), "pending", &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(got.len(), 30);
    assert_eq!(timestamps(&got), (1..=30).rev().collect::<Vec<_>>());
    assert!(got.iter().all(|order| order.status == "pending"));
}

#[tokio::test]
async fn test_get_by_index_ascending_with_sort_range() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    for order in orders("pending", 30) {
        repo.put(&order).await.unwrap();
    }

    let options = QueryOptions::default()
        .ascending()
        .sort(SortQuery::between(10_u64, 19_u64));
    let got = repo.get_by_index(Some("byStatus"), "pending", &options).await.unwrap();
    assert_eq!(timestamps(&got), (10..=19).collect::<Vec<_>>());

    let options = QueryOptions::default().sort(SortQuery::equal(7_u64));
    let got = repo.get_by_index(Some("byStatus"), "pending", &options).await.unwrap();
    assert_eq!(timestamps(&got), [7]);
}

#[tokio::test]
async fn test_get_by_index_follows_every_page() {
    let store = MemoryStore::new().with_page_limit(7);
    let (repo, store) =
        memory_repository_with::<TestOrder>(orders_table("orders"), store, RepositoryConfig::default()).await;
    for order in orders("pending", 30) {
        repo.put(&order).await.unwrap();
    }
    store.clear_calls().await;

    let got = repo
        .get_by_index(Some("byStatus"), "pending", &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(timestamps(&got), (1..=30).rev().collect::<Vec<_>>());
    assert_eq!(calls_of(&store, Operation::Query).await.len(), 5);
}

#[tokio::test]
async fn test_get_by_index_paginated() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    for order in orders("pending", 30) {
        repo.put(&order).await.unwrap();
    }

    let first = repo
        .get_by_index_paginated(Some("byStatus"), "pending", None, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(first.elements.len(), 25);
    assert!(first.has_more());
    assert_eq!(first.elements[0].timestamp, 30);

    let second = repo
        .get_by_index_paginated(Some("byStatus"), "pending", first.end_key, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(timestamps(&second.elements), [5, 4, 3, 2, 1]);
    assert!(second.end_key.is_none());
}

#[tokio::test]
async fn test_paginated_page_size_from_config() {
    let config = RepositoryConfig::default().with_page_size(10);
    let (repo, store) =
        memory_repository_with::<TestOrder>(orders_table("orders"), MemoryStore::new(), config).await;
    for order in orders("pending", 12) {
        repo.put(&order).await.unwrap();
    }

    let page = repo
        .get_by_index_paginated(Some("byStatus"), "pending", None, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(page.elements.len(), 10);

    let queries = calls_of(&store, Operation::Query).await;
    assert!(matches!(
        queries.last(),
        Some(balerial_dynamo::store::StoreCall::Query { limit: Some(10), .. })
    ));
}

#[tokio::test]
async fn test_paginated_resumes_after_deleted_end_key_record() {
    let config = RepositoryConfig::default().with_page_size(5);
    let (repo, _store) =
        memory_repository_with::<TestOrder>(orders_table("orders"), MemoryStore::new(), config).await;
    for order in orders("pending", 12) {
        repo.put(&order).await.unwrap();
    }

    let first = repo
        .get_by_index_paginated(Some("byStatus"), "pending", None, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(timestamps(&first.elements), [12, 11, 10, 9, 8]);

    repo.delete("order-08", None).await.unwrap();

    let second = repo
        .get_by_index_paginated(Some("byStatus"), "pending", first.end_key, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(timestamps(&second.elements), [7, 6, 5, 4, 3]);
    assert!(second.has_more());
}

#[tokio::test]
async fn test_non_positive_limits_are_rejected() {
    let config = RepositoryConfig::default().with_page_size(0);
    let (repo, store) =
        memory_repository_with::<TestOrder>(orders_table("orders"), MemoryStore::new(), config).await;
    for order in orders("pending", 3) {
        repo.put(&order).await.unwrap();
    }
    store.clear_calls().await;

    let err = repo
        .get_by_index_paginated(Some("byStatus"), "pending", None, &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let err = repo.scan(&ScanOptions::default().limit(0)).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedQuery(_)));

    let err = repo.scan(&ScanOptions::default().limit(-5)).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedQuery(_)));

    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_partition_key_filter_is_dropped() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    for order in orders("pending", 5) {
        repo.put(&order).await.unwrap();
    }

    // Would contradict the key condition if it reached the store
    let options = QueryOptions::default().filter(FilterElement::equal("status", "done"));
    let got = repo.get_by_index(Some("byStatus"), "pending", &options).await.unwrap();
    assert_eq!(got.len(), 5);
}

#[tokio::test]
async fn test_default_filters_scope_reads() {
    let table = TableDescriptor::builder()
        .table_name("orders")
        .primary_index(balerial_dynamo::KeyAttribute::string("uuid"), None)
        .secondary_index(
            "byStatus",
            balerial_dynamo::KeyAttribute::string("status"),
            Some(balerial_dynamo::KeyAttribute::number("timestamp")),
        )
        .default_filters(vec![FilterElement::equal("storeId", "store-1")])
        .build()
        .unwrap();
    let (repo, _store) = memory_repository::<TestOrder>(table).await;

    for mut order in orders("pending", 6) {
        if order.timestamp % 2 == 0 {
            order.store_id = "store-2".to_string();
        }
        repo.put(&order).await.unwrap();
    }

    let got = repo
        .get_by_index(Some("byStatus"), "pending", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(timestamps(&got), [5, 3, 1]);

    let page = repo.scan(&ScanOptions::default()).await.unwrap();
    assert_eq!(page.elements.len(), 3);
}

#[tokio::test]
async fn test_filters_on_nested_attributes() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    for order in orders("pending", 30) {
        repo.put(&order).await.unwrap();
    }

    let options = QueryOptions::default()
        .filter(FilterElement::equal("customer.name", "Customer 12"))
        .filter(FilterElement::exists("customerId"))
        .filter(FilterElement::not_exists("deletedAt"));
    let got = repo.get_by_index(Some("byStatus"), "pending", &options).await.unwrap();
    assert_eq!(timestamps(&got), [12]);

    let options = QueryOptions::default().filter(FilterElement::not_equal("customerId", "customer-0"));
    let got = repo.get_by_index(Some("byStatus"), "pending", &options).await.unwrap();
    assert_eq!(got.len(), 20);
}

#[tokio::test]
async fn test_search() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    for order in orders("pending", 30) {
        repo.put(&order).await.unwrap();
    }

    let got = repo
        .search(Some("byStatus"), "pending", "uuid", "order-2", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(timestamps(&got), (20..=29).rev().collect::<Vec<_>>());

    let got = repo
        .search_in_nested_fields(
            Some("byStatus"),
            "pending",
            &["customer", "searchName"],
            "customer1",
            &QueryOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(got.len(), 11);

    let by_path = repo
        .search(Some("byStatus"), "pending", "customer.searchName", "customer1", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(by_path, got);
}

#[tokio::test]
async fn test_scan_projected() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    for order in orders("pending", 12) {
        repo.put(&order).await.unwrap();
    }

    let options = ScanOptions::default().projection(["uuid", "status"]).limit(10);
    let first = repo.scan_projected::<TestOrderSummary>(&options).await.unwrap();
    assert_eq!(first.elements.len(), 10);
    assert_eq!(first.elements[0].uuid, "order-01");
    assert!(first.has_more());

    let options = options.start_key(first.end_key);
    let second = repo.scan_projected::<TestOrderSummary>(&options).await.unwrap();
    assert_eq!(
        second.elements,
        [
            TestOrderSummary {
                uuid: "order-11".to_string(),
                status: "pending".to_string()
            },
            TestOrderSummary {
                uuid: "order-12".to_string(),
                status: "pending".to_string()
            },
        ]
    );
    assert!(!second.has_more());
}

#[tokio::test]
async fn test_scan_keeps_partition_key_filters() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    for order in orders("pending", 3) {
        repo.put(&order).await.unwrap();
    }
    repo.put(&TestOrder::new("order-done", "done", 99)).await.unwrap();

    let options = ScanOptions::default()
        .index("byStatus")
        .filter(FilterElement::equal("status", "done"));
    let page = repo.scan(&options).await.unwrap();
    assert_eq!(page.elements.len(), 1);
    assert_eq!(page.elements[0].uuid, "order-done");
}

#[tokio::test]
async fn test_query_errors() {
    let (repo, _store) = memory_repository::<TestOrder>(orders_table("orders")).await;

    let err = repo
        .get_by_index(Some("byColor"), "red", &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "secondary index", .. }));

    let options = QueryOptions::default().sort(SortQuery::equal(1_u64));
    let err = repo.get_by_index(None, "order-01", &options).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedQuery(_)));

    let options = QueryOptions::default().filter(FilterElement::new("customerId", FilterExpression::Contains, None));
    let err = repo.get_by_index(Some("byStatus"), "pending", &options).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedExpression(_)));
}

#[tokio::test]
async fn test_store_failure_is_propagated() {
    let (repo, store) = memory_repository::<TestOrder>(orders_table("orders")).await;
    store.fail_on(Operation::Query).await;

    let err = repo
        .get_by_index(Some("byStatus"), "pending", &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_store_error());
    assert!(matches!(
        err,
        Error::Store(StoreError::Rejected {
            operation: Operation::Query,
            ..
        })
    ));
}

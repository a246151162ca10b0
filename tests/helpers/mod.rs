/// Test helpers and fixtures for repository integration tests
///
/// This module provides common test utilities, fixtures, and helper functions
/// used across all integration tests.
pub mod fixtures;

pub use serde::{Deserialize, Serialize};

// Re-export common fixtures
#[allow(unused_imports)]
pub use fixtures::{orders_table, pricing_table, TestCustomer, TestOrder, TestOrderSummary, TestPricing};

use balerial_dynamo::store::StoreCall;
use balerial_dynamo::{MemoryStore, Repository, RepositoryConfig, TableDescriptor};

/// In-memory repository over a freshly registered table
#[allow(dead_code)]
pub async fn memory_repository<T>(table: TableDescriptor) -> (Repository<T, MemoryStore>, MemoryStore)
where
    T: balerial_dynamo::Record,
{
    memory_repository_with(table, MemoryStore::new(), RepositoryConfig::default()).await
}

/// In-memory repository with an explicit store and configuration
#[allow(dead_code)]
pub async fn memory_repository_with<T>(
    table: TableDescriptor,
    store: MemoryStore,
    config: RepositoryConfig,
) -> (Repository<T, MemoryStore>, MemoryStore)
where
    T: balerial_dynamo::Record,
{
    store.create_table(&table).await;
    (Repository::with_config(store.clone(), table, config), store)
}

/// Orders with `status` at timestamps `1..=count`, uuids `order-01`, `order-02`, ...
#[allow(dead_code)]
pub fn orders(status: &str, count: u64) -> Vec<TestOrder> {
    (1..=count)
        .map(|timestamp| TestOrder::new(format!("order-{timestamp:02}"), status, timestamp))
        .collect()
}

/// Recorded calls of one kind
#[allow(dead_code)]
pub async fn calls_of(store: &MemoryStore, operation: balerial_dynamo::Operation) -> Vec<StoreCall> {
    store
        .calls()
        .await
        .into_iter()
        .filter(|call| call.operation() == operation)
        .collect()
}

/// Wait for eventual consistency
///
/// Global secondary indexes may not immediately reflect recent writes.
#[allow(dead_code)]
pub async fn wait_for_consistency() {
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
}

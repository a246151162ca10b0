//! # Balerial DynamoDB access layer
//!
//! A typed repository over DynamoDB-style tables:
//! - Table descriptors with a primary index, named secondary indexes and default filters
//! - Index reads, exhaustive or one page at a time, in sort-key order
//! - Filter expressions on nested attributes, with placeholder compilation
//! - Partial updates that refuse to touch key attributes
//! - Atomic delete-and-put when a record's key changes
//! - Chunked batch writes with retry of unprocessed items
//! - An in-memory store for tests and local development
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use balerial_dynamo::{
//!     DynamoStore, Error, FilterElement, KeyAttribute, QueryOptions, Repository, SortQuery,
//!     StoreConfig, TableDescriptor,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Order {
//!     uuid: String,
//!     status: String,
//!     timestamp: u64,
//!     customer_id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let table = TableDescriptor::builder()
//!         .table_name("prod-orders")
//!         .primary_index(KeyAttribute::string("uuid"), None)
//!         .secondary_index("byStatus", KeyAttribute::string("status"), Some(KeyAttribute::number("timestamp")))
//!         .build()?;
//!
//!     let store = DynamoStore::connect(&StoreConfig::from_env()).await;
//!     let orders: Repository<Order> = Repository::new(store, table);
//!
//!     // Put an order
//!     let order = Order {
//!         uuid: "o-1".to_string(),
//!         status: "pending".to_string(),
//!         timestamp: 1_700_000_000,
//!         customer_id: "c-1".to_string(),
//!     };
//!     orders.put(&order).await?;
//!
//!     // Every pending order of this week for one customer, newest first
//!     let options = QueryOptions::default()
//!         .sort(SortQuery::between(1_699_900_000_u64, 1_700_500_000_u64))
//!         .filter(FilterElement::equal("customerId", "c-1"));
//!     let pending = orders.get_by_index(Some("byStatus"), "pending", &options).await?;
//!
//!     // Close the order
//!     orders
//!         .update_fields("o-1", &serde_json::json!({ "status": "done" }), None)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod config;
mod error;
pub use config::{RepositoryConfig, StoreConfig};
pub use error::{Error, StoreError};

pub mod expression;

pub mod registry;

pub mod repository;

/// Table creation
pub mod setup;

pub mod store;

/// Index model and table descriptors
pub mod table;

// Re-export main types for convenience
pub use expression::{FilterElement, FilterExpression, SortQuery};
pub use repository::{QueryOptions, Record, Repository, ScanOptions};
pub use store::{DynamoStore, MemoryStore, Operation, Store};
pub use table::{
    Index, IndexKind, KeyAttribute, KeyType, PageKey, PaginatedResult, RetryConfig, Scalar,
    TableDescriptor, TableDescriptorBuilder,
};

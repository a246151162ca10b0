//! Store boundary
//!
//! The repository talks to its backing store only through [`Store`]. Requests
//! carry the typed expression model; [`DynamoStore`] renders it into DynamoDB
//! requests and [`MemoryStore`] evaluates it in process.

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::{MemoryStore, StoreCall};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::fmt;

use crate::error::StoreError;
use crate::expression::{AttributePath, KeyCondition, Predicate};
use crate::table::Item;

/// Store call kinds, used in logs and for fault injection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Key-condition query
    Query,
    /// Table or index scan
    Scan,
    /// Single-item read
    GetItem,
    /// Single-item upsert
    PutItem,
    /// Partial single-item update
    UpdateItem,
    /// Single-item delete
    DeleteItem,
    /// Multi-item transaction
    TransactWrite,
    /// Batched puts and deletes
    BatchWrite,
}

impl Operation {
    /// DynamoDB API name of the call
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Query => "Query",
            Operation::Scan => "Scan",
            Operation::GetItem => "GetItem",
            Operation::PutItem => "PutItem",
            Operation::UpdateItem => "UpdateItem",
            Operation::DeleteItem => "DeleteItem",
            Operation::TransactWrite => "TransactWriteItems",
            Operation::BatchWrite => "BatchWriteItem",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-condition read of one page
#[derive(Clone, Debug)]
pub struct QueryRequest {
    /// Table to query
    pub table_name: String,
    /// Secondary index to query, `None` for the table itself
    pub index_name: Option<String>,
    /// Partition (and optional sort) key condition
    pub key_condition: KeyCondition,
    /// Conjunctive filters applied after the key condition
    pub filters: Vec<Predicate>,
    /// Attributes to return, empty for all
    pub projection: Vec<AttributePath>,
    /// Ascending sort-key order when `true`
    pub scan_index_forward: bool,
    /// Maximum number of items to evaluate
    pub limit: Option<i32>,
    /// Key to resume after
    pub exclusive_start_key: Option<Item>,
}

/// Table or index scan of one page
#[derive(Clone, Debug)]
pub struct ScanRequest {
    /// Table to scan
    pub table_name: String,
    /// Secondary index to scan, `None` for the table itself
    pub index_name: Option<String>,
    /// Conjunctive filters
    pub filters: Vec<Predicate>,
    /// Attributes to return, empty for all
    pub projection: Vec<AttributePath>,
    /// Maximum number of items to evaluate
    pub limit: Option<i32>,
    /// Key to resume after
    pub exclusive_start_key: Option<Item>,
}

/// Partial update of one item
#[derive(Clone, Debug)]
pub struct UpdateRequest {
    /// Table holding the item
    pub table_name: String,
    /// Primary key of the item
    pub key: Item,
    /// Top-level attributes to set
    pub assignments: Vec<(String, AttributeValue)>,
}

/// One page returned by a query or a scan
#[derive(Clone, Debug, Default)]
pub struct Page {
    /// Items on the page
    pub items: Vec<Item>,
    /// Key to resume after, absent on the last page
    pub last_evaluated_key: Option<Item>,
}

/// One write inside a transaction or a batch
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Full replace of an item
    Put {
        /// Table holding the item
        table_name: String,
        /// Complete item
        item: Item,
    },
    /// Delete by primary key
    Delete {
        /// Table holding the item
        table_name: String,
        /// Primary key of the item
        key: Item,
    },
}

/// Outcome of one batch-write call
#[derive(Clone, Debug, Default)]
pub struct BatchWriteResponse {
    /// Writes the store did not apply and that may be resent
    pub unprocessed: Vec<WriteOp>,
}

/// Backing store of the repository
///
/// Implementations must be safe for concurrent use; the repository holds no
/// other shared state.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads one page of a key-condition query
    async fn query(&self, request: QueryRequest) -> Result<Page, StoreError>;

    /// Reads one page of a scan
    async fn scan(&self, request: ScanRequest) -> Result<Page, StoreError>;

    /// Reads one item by primary key
    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, StoreError>;

    /// Replaces one item unconditionally
    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError>;

    /// Sets attributes of one item
    async fn update_item(&self, request: UpdateRequest) -> Result<(), StoreError>;

    /// Deletes one item by primary key
    async fn delete_item(&self, table_name: &str, key: Item) -> Result<(), StoreError>;

    /// Applies every write or none of them
    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Sends one batch of at most 25 writes against a single table
    async fn batch_write(&self, table_name: &str, ops: Vec<WriteOp>) -> Result<BatchWriteResponse, StoreError>;
}

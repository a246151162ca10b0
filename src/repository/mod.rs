//! Generic repository engine
//!
//! A [`Repository`] binds a record type to a [`TableDescriptor`] and a
//! [`Store`]. It turns index reads, scans and writes into store requests,
//! follows continuation keys for exhaustive reads, chunks batch writes and
//! swaps records atomically when their key changes.

mod batch;
mod operations;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::RepositoryConfig;
use crate::error::{Error, StoreError};
use crate::expression::{FilterElement, SortQuery};
use crate::store::{DynamoStore, Operation, Store};
use crate::table::{KeyAttribute, PageKey, TableDescriptor};

/// Records a repository can store
///
/// Blanket-implemented for every `Serialize + DeserializeOwned + Send + Sync` type.
/// The serialized form must carry the table's primary key attributes.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Send + Sync {}

/// Shape of an index read
#[derive(Clone, Debug)]
pub struct QueryOptions {
    /// Condition on the index sort key
    pub sort: Option<SortQuery>,
    /// Descending sort-key order, the default
    pub descending: bool,
    /// Filters merged with the table's default filters
    pub filters: Vec<FilterElement>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            sort: None,
            descending: true,
            filters: Vec::new(),
        }
    }
}

impl QueryOptions {
    /// Restricts the read with a sort-key condition
    pub fn sort(mut self, sort: SortQuery) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Returns records in ascending sort-key order
    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }

    /// Adds a filter
    pub fn filter(mut self, filter: FilterElement) -> Self {
        self.filters.push(filter);
        self
    }

    /// Replaces the filters
    pub fn filters(mut self, filters: Vec<FilterElement>) -> Self {
        self.filters = filters;
        self
    }
}

/// Shape of a single-page scan
#[derive(Clone, Debug, Default)]
pub struct ScanOptions {
    /// Filters merged with the table's default filters
    pub filters: Vec<FilterElement>,
    /// Attribute paths to return, empty for whole records
    pub projection: Vec<String>,
    /// Maximum number of items to evaluate
    pub limit: Option<i32>,
    /// Secondary index to scan instead of the table
    pub index: Option<String>,
    /// Cursor returned by the previous page
    pub start_key: Option<PageKey>,
}

impl ScanOptions {
    /// Adds a filter
    pub fn filter(mut self, filter: FilterElement) -> Self {
        self.filters.push(filter);
        self
    }

    /// Returns only the given attribute paths
    pub fn projection<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.projection = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Caps the number of evaluated items
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Scans a secondary index
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Resumes after a previous page
    pub fn start_key(mut self, start_key: Option<PageKey>) -> Self {
        self.start_key = start_key;
        self
    }
}

/// Typed access to one table
///
/// The repository keeps no state besides the store handle, the shared table
/// descriptor and its configuration, so it can be cloned and used concurrently.
///
/// # Example
///
/// ```rust,no_run
/// use balerial_dynamo::{KeyAttribute, MemoryStore, QueryOptions, Repository, TableDescriptor};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Order {
///     uuid: String,
///     status: String,
///     timestamp: u64,
/// }
///
/// # async fn example() -> Result<(), balerial_dynamo::Error> {
/// let table = TableDescriptor::builder()
///     .table_name("orders")
///     .primary_index(KeyAttribute::string("uuid"), None)
///     .secondary_index("byStatus", KeyAttribute::string("status"), Some(KeyAttribute::number("timestamp")))
///     .build()?;
///
/// let store = MemoryStore::new();
/// store.create_table(&table).await;
///
/// let orders: Repository<Order, MemoryStore> = Repository::new(store, table);
/// let pending = orders
///     .get_by_index(Some("byStatus"), "pending", &QueryOptions::default())
///     .await?;
/// # let _ = pending;
/// # Ok(())
/// # }
/// ```
pub struct Repository<T, S = DynamoStore> {
    store: S,
    table: Arc<TableDescriptor>,
    config: RepositoryConfig,
    _record: PhantomData<fn() -> T>,
}

impl<T, S> Clone for Repository<T, S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            table: Arc::clone(&self.table),
            config: self.config.clone(),
            _record: PhantomData,
        }
    }
}

impl<T, S> fmt::Debug for Repository<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.table.table_name())
            .field("record", &std::any::type_name::<T>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T, S> Repository<T, S>
where
    T: Record,
    S: Store,
{
    /// Repository with the default configuration
    pub fn new(store: S, table: impl Into<Arc<TableDescriptor>>) -> Self {
        Self::with_config(store, table, RepositoryConfig::default())
    }

    /// Repository with an explicit configuration
    pub fn with_config(store: S, table: impl Into<Arc<TableDescriptor>>, config: RepositoryConfig) -> Self {
        Self {
            store,
            table: table.into(),
            config,
            _record: PhantomData,
        }
    }

    /// Table this repository reads and writes
    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Engine configuration
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    fn log_store_error(&self, operation: Operation, error: &StoreError) {
        let primary = self.table.primary_index();
        tracing::error!(
            table = self.table.table_name(),
            partition_key = primary.partition_key().name(),
            sort_key = ?primary.sort_key().map(KeyAttribute::name),
            %operation,
            %error,
            "store call failed"
        );
    }

    /// Logs a failed store call and converts it into the engine error
    fn checked<R>(&self, operation: Operation, result: Result<R, StoreError>) -> Result<R, Error> {
        result.map_err(|error| {
            self.log_store_error(operation, &error);
            Error::Store(error)
        })
    }
}

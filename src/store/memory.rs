use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::expression::{AttributePath, Predicate, SortCondition};
use crate::store::{
    BatchWriteResponse, Operation, Page, QueryRequest, ScanRequest, Store, UpdateRequest, WriteOp,
};
use crate::table::{Index, Item, TableDescriptor};

const BATCH_WRITE_LIMIT: usize = 25;

/// A call received by a [`MemoryStore`]
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    /// Query page request
    Query {
        /// Queried table
        table_name: String,
        /// Queried index
        index_name: Option<String>,
        /// Requested limit
        limit: Option<i32>,
    },
    /// Scan page request
    Scan {
        /// Scanned table
        table_name: String,
        /// Scanned index
        index_name: Option<String>,
        /// Requested limit
        limit: Option<i32>,
    },
    /// Single-item read
    GetItem {
        /// Target table
        table_name: String,
    },
    /// Single-item put
    PutItem {
        /// Target table
        table_name: String,
    },
    /// Single-item update
    UpdateItem {
        /// Target table
        table_name: String,
        /// Attributes set
        fields: Vec<String>,
    },
    /// Single-item delete
    DeleteItem {
        /// Target table
        table_name: String,
    },
    /// Transaction
    TransactWrite {
        /// Writes in the transaction
        ops: Vec<WriteOp>,
    },
    /// Batch write
    BatchWrite {
        /// Target table
        table_name: String,
        /// Writes in the batch
        ops: Vec<WriteOp>,
    },
}

impl StoreCall {
    /// Kind of store call
    pub fn operation(&self) -> Operation {
        match self {
            StoreCall::Query { .. } => Operation::Query,
            StoreCall::Scan { .. } => Operation::Scan,
            StoreCall::GetItem { .. } => Operation::GetItem,
            StoreCall::PutItem { .. } => Operation::PutItem,
            StoreCall::UpdateItem { .. } => Operation::UpdateItem,
            StoreCall::DeleteItem { .. } => Operation::DeleteItem,
            StoreCall::TransactWrite { .. } => Operation::TransactWrite,
            StoreCall::BatchWrite { .. } => Operation::BatchWrite,
        }
    }
}

#[derive(Clone, Debug)]
struct MemoryTable {
    descriptor: TableDescriptor,
    items: Vec<Item>,
}

impl MemoryTable {
    fn index(&self, operation: Operation, index_name: Option<&str>) -> Result<&Index, StoreError> {
        self.descriptor
            .index(index_name)
            .map_err(|e| rejected(operation, format!("ValidationException: {e}")))
    }

    fn primary_key(&self, operation: Operation, item: &Item) -> Result<Item, StoreError> {
        self.descriptor
            .primary_key_of(item)
            .map_err(|e| rejected(operation, format!("ValidationException: {e}")))
    }

    fn position(&self, key: &Item) -> Option<usize> {
        let primary = self.descriptor.primary_index();
        self.items
            .iter()
            .position(|item| primary.key_names().all(|name| item.get(name) == key.get(name)))
    }

    fn apply(&mut self, operation: Operation, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Put { item, .. } => {
                let key = self.primary_key(operation, &item)?;
                match self.position(&key) {
                    Some(position) => self.items[position] = item,
                    None => self.items.push(item),
                }
            }
            WriteOp::Delete { key, .. } => {
                let key = self.primary_key(operation, &key)?;
                if let Some(position) = self.position(&key) {
                    let _ = self.items.remove(position);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing: HashSet<Operation>,
    unprocessed_per_call: usize,
    unprocessed_calls: usize,
}

/// In-process [`Store`] for tests and local development
///
/// Tables must be registered with [`create_table`](Self::create_table) before use.
/// Reads follow DynamoDB's paging rules: `limit` caps the number of evaluated
/// items before filtering, and every page is additionally capped at the store's
/// page limit, which stands in for DynamoDB's 1 MB response size. Every call is
/// recorded and failures can be injected per operation.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, MemoryTable>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    faults: Arc<Mutex<Faults>>,
    page_limit: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store without a page size cap
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            faults: Arc::new(Mutex::new(Faults::default())),
            page_limit: usize::MAX,
        }
    }

    /// Caps every query and scan page at `page_limit` evaluated items
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Registers an empty table; re-registering keeps existing items
    pub async fn create_table(&self, descriptor: &TableDescriptor) {
        let mut tables = self.tables.write().await;
        let _ = tables
            .entry(descriptor.table_name().to_string())
            .and_modify(|table| table.descriptor = descriptor.clone())
            .or_insert_with(|| MemoryTable {
                descriptor: descriptor.clone(),
                items: Vec::new(),
            });
    }

    /// Every item of a table, in insertion order
    pub async fn items(&self, table_name: &str) -> Vec<Item> {
        self.tables
            .read()
            .await
            .get(table_name)
            .map(|table| table.items.clone())
            .unwrap_or_default()
    }

    /// Calls received so far
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    /// Forgets the recorded calls
    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Makes every following call of `operation` fail
    pub async fn fail_on(&self, operation: Operation) {
        let _ = self.faults.lock().await.failing.insert(operation);
    }

    /// Leaves the last `per_call` writes of the next `calls` batch writes unprocessed
    pub async fn leave_unprocessed(&self, per_call: usize, calls: usize) {
        let mut faults = self.faults.lock().await;
        faults.unprocessed_per_call = per_call;
        faults.unprocessed_calls = calls;
    }

    /// Removes every injected failure
    pub async fn clear_faults(&self) {
        *self.faults.lock().await = Faults::default();
    }

    async fn begin(&self, call: StoreCall) -> Result<(), StoreError> {
        let operation = call.operation();
        self.calls.lock().await.push(call);

        if self.faults.lock().await.failing.contains(&operation) {
            return Err(StoreError::Rejected {
                operation,
                message: "injected failure".to_string(),
                conditional: operation == Operation::TransactWrite,
            });
        }
        Ok(())
    }

    fn paginate(
        &self,
        table: &MemoryTable,
        index: &Index,
        remaining: Vec<&Item>,
        limit: Option<i32>,
        filters: &[Predicate],
        projection: &[AttributePath],
    ) -> Page {
        let primary = table.descriptor.primary_index();

        let page_size = limit
            .map(|limit| limit.max(1) as usize)
            .unwrap_or(usize::MAX)
            .min(self.page_limit);

        let evaluated = &remaining[..remaining.len().min(page_size)];

        let last_evaluated_key = if remaining.len() > evaluated.len() {
            evaluated.last().map(|item| {
                primary
                    .key_names()
                    .chain(index.key_names())
                    .filter_map(|name| item.get(name).map(|value| (name.to_string(), value.clone())))
                    .collect::<Item>()
            })
        } else {
            None
        };

        let items = evaluated
            .iter()
            .filter(|item| filters.iter().all(|predicate| evaluate(item, predicate)))
            .map(|item| project(item, projection))
            .collect();

        Page {
            items,
            last_evaluated_key,
        }
    }
}

fn rejected(operation: Operation, message: impl Into<String>) -> StoreError {
    StoreError::Rejected {
        operation,
        message: message.into(),
        conditional: false,
    }
}

fn check_limit(operation: Operation, limit: Option<i32>) -> Result<(), StoreError> {
    match limit {
        Some(limit) if limit < 1 => Err(rejected(
            operation,
            format!("ValidationException: limit {limit} is less than 1"),
        )),
        _ => Ok(()),
    }
}

fn lookup<'a>(
    tables: &'a HashMap<String, MemoryTable>,
    operation: Operation,
    table_name: &str,
) -> Result<&'a MemoryTable, StoreError> {
    tables.get(table_name).ok_or_else(|| {
        rejected(
            operation,
            format!("ResourceNotFoundException: table {table_name} does not exist"),
        )
    })
}

fn lookup_mut<'a>(
    tables: &'a mut HashMap<String, MemoryTable>,
    operation: Operation,
    table_name: &str,
) -> Result<&'a mut MemoryTable, StoreError> {
    tables.get_mut(table_name).ok_or_else(|| {
        rejected(
            operation,
            format!("ResourceNotFoundException: table {table_name} does not exist"),
        )
    })
}

fn compare_values(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (Some(AttributeValue::N(a)), Some(AttributeValue::N(b))) => {
            match (a.parse::<f64>(), b.parse::<f64>()) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => a.cmp(b),
            }
        }
        (Some(AttributeValue::S(a)), Some(AttributeValue::S(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn compare_items(a: &Item, b: &Item, keys: &[&str]) -> Ordering {
    keys.iter()
        .map(|key| compare_values(a.get(*key), b.get(*key)))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Drops every item up to and including the position of `start` in `order`,
/// whether or not an item with that key still exists
fn resume_after<'a>(
    mut ordered: Vec<&'a Item>,
    start: Option<&Item>,
    order: &[&str],
    descending: bool,
) -> Vec<&'a Item> {
    let Some(start) = start else {
        return ordered;
    };

    let after = if descending { Ordering::Less } else { Ordering::Greater };
    let offset = ordered
        .iter()
        .position(|item| compare_items(item, start, order) == after)
        .unwrap_or(ordered.len());
    ordered.split_off(offset)
}

fn sort_matches(item: &Item, sort: Option<&SortCondition>) -> bool {
    match sort {
        None => true,
        Some(SortCondition::Equal(name, value)) => item.get(name) == Some(value),
        Some(SortCondition::Between(name, start, end)) => match item.get(name) {
            None => false,
            Some(value) => {
                compare_values(Some(value), Some(start)) != Ordering::Less
                    && compare_values(Some(value), Some(end)) != Ordering::Greater
            }
        },
    }
}

fn resolve<'a>(item: &'a Item, path: &AttributePath) -> Option<&'a AttributeValue> {
    let mut segments = path.segments().iter();
    let mut current = item.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            AttributeValue::M(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn evaluate(item: &Item, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Equal(path, value) => resolve(item, path) == Some(value),
        Predicate::NotEqual(path, value) => resolve(item, path) != Some(value),
        Predicate::Contains(path, value) => match (resolve(item, path), value) {
            (Some(AttributeValue::S(haystack)), AttributeValue::S(needle)) => {
                haystack.contains(needle.as_str())
            }
            (Some(AttributeValue::Ss(set)), AttributeValue::S(needle)) => set.contains(needle),
            (Some(AttributeValue::Ns(set)), AttributeValue::N(needle)) => set.contains(needle),
            (Some(AttributeValue::L(list)), value) => list.contains(value),
            _ => false,
        },
        Predicate::Exists(path) => resolve(item, path).is_some(),
        Predicate::NotExists(path) => resolve(item, path).is_none(),
    }
}

fn insert_path(target: &mut Item, segments: &[String], value: AttributeValue) {
    match segments {
        [] => {}
        [last] => {
            let _ = target.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let entry = target
                .entry(first.clone())
                .or_insert_with(|| AttributeValue::M(HashMap::new()));
            if let AttributeValue::M(map) = entry {
                insert_path(map, rest, value);
            }
        }
    }
}

fn project(item: &Item, projection: &[AttributePath]) -> Item {
    if projection.is_empty() {
        return item.clone();
    }

    let mut projected = Item::new();
    for path in projection {
        if let Some(value) = resolve(item, path) {
            insert_path(&mut projected, path.segments(), value.clone());
        }
    }
    projected
}

#[async_trait]
impl Store for MemoryStore {
    async fn query(&self, request: QueryRequest) -> Result<Page, StoreError> {
        self.begin(StoreCall::Query {
            table_name: request.table_name.clone(),
            index_name: request.index_name.clone(),
            limit: request.limit,
        })
        .await?;
        check_limit(Operation::Query, request.limit)?;

        let tables = self.tables.read().await;
        let table = lookup(&tables, Operation::Query, &request.table_name)?;
        let index = table.index(Operation::Query, request.index_name.as_deref())?;
        let condition = &request.key_condition;

        if condition.partition_key != index.partition_key().name() {
            return Err(rejected(
                Operation::Query,
                format!(
                    "ValidationException: {} is not the partition key of {index}",
                    condition.partition_key
                ),
            ));
        }

        let mut ordered: Vec<&Item> = table
            .items
            .iter()
            .filter(|item| item.get(&condition.partition_key) == Some(&condition.partition_value))
            .filter(|item| sort_matches(item, condition.sort.as_ref()))
            .collect();

        let primary = table.descriptor.primary_index();
        let order: Vec<&str> = index.sort_key().map(|key| key.name()).into_iter().chain(primary.key_names()).collect();
        ordered.sort_by(|a, b| compare_items(a, b, &order));
        if !request.scan_index_forward {
            ordered.reverse();
        }
        let remaining = resume_after(
            ordered,
            request.exclusive_start_key.as_ref(),
            &order,
            !request.scan_index_forward,
        );

        Ok(self.paginate(
            table,
            index,
            remaining,
            request.limit,
            &request.filters,
            &request.projection,
        ))
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page, StoreError> {
        self.begin(StoreCall::Scan {
            table_name: request.table_name.clone(),
            index_name: request.index_name.clone(),
            limit: request.limit,
        })
        .await?;
        check_limit(Operation::Scan, request.limit)?;

        let tables = self.tables.read().await;
        let table = lookup(&tables, Operation::Scan, &request.table_name)?;
        let index = table.index(Operation::Scan, request.index_name.as_deref())?;

        let mut ordered: Vec<&Item> = table
            .items
            .iter()
            .filter(|item| index.key_names().all(|name| item.contains_key(name)))
            .collect();

        let order: Vec<&str> = index.key_names().chain(table.descriptor.primary_index().key_names()).collect();
        ordered.sort_by(|a, b| compare_items(a, b, &order));
        let remaining = resume_after(ordered, request.exclusive_start_key.as_ref(), &order, false);

        Ok(self.paginate(
            table,
            index,
            remaining,
            request.limit,
            &request.filters,
            &request.projection,
        ))
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, StoreError> {
        self.begin(StoreCall::GetItem {
            table_name: table_name.to_string(),
        })
        .await?;

        let tables = self.tables.read().await;
        let table = lookup(&tables, Operation::GetItem, table_name)?;
        let key = table.primary_key(Operation::GetItem, &key)?;

        Ok(table.position(&key).map(|position| table.items[position].clone()))
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError> {
        self.begin(StoreCall::PutItem {
            table_name: table_name.to_string(),
        })
        .await?;

        let mut tables = self.tables.write().await;
        lookup_mut(&mut tables, Operation::PutItem, table_name)?.apply(
            Operation::PutItem,
            WriteOp::Put {
                table_name: table_name.to_string(),
                item,
            },
        )
    }

    async fn update_item(&self, request: UpdateRequest) -> Result<(), StoreError> {
        self.begin(StoreCall::UpdateItem {
            table_name: request.table_name.clone(),
            fields: request.assignments.iter().map(|(field, _)| field.clone()).collect(),
        })
        .await?;

        let mut tables = self.tables.write().await;
        let table = lookup_mut(&mut tables, Operation::UpdateItem, &request.table_name)?;
        let key = table.primary_key(Operation::UpdateItem, &request.key)?;

        let position = match table.position(&key) {
            Some(position) => position,
            None => {
                table.items.push(key);
                table.items.len() - 1
            }
        };

        let item = &mut table.items[position];
        for (field, value) in request.assignments {
            let _ = item.insert(field, value);
        }
        Ok(())
    }

    async fn delete_item(&self, table_name: &str, key: Item) -> Result<(), StoreError> {
        self.begin(StoreCall::DeleteItem {
            table_name: table_name.to_string(),
        })
        .await?;

        let mut tables = self.tables.write().await;
        lookup_mut(&mut tables, Operation::DeleteItem, table_name)?.apply(
            Operation::DeleteItem,
            WriteOp::Delete {
                table_name: table_name.to_string(),
                key,
            },
        )
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.begin(StoreCall::TransactWrite { ops: ops.clone() }).await?;

        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let mut touched: Vec<(String, Item)> = Vec::with_capacity(ops.len());

        for op in ops {
            let (table_name, item) = match &op {
                WriteOp::Put { table_name, item } => (table_name.clone(), item),
                WriteOp::Delete { table_name, key } => (table_name.clone(), key),
            };
            let table = lookup_mut(&mut staged, Operation::TransactWrite, &table_name)?;
            let key = table.primary_key(Operation::TransactWrite, item)?;

            if touched.contains(&(table_name.clone(), key.clone())) {
                return Err(rejected(
                    Operation::TransactWrite,
                    "ValidationException: transaction request cannot include multiple operations on one item",
                ));
            }
            touched.push((table_name, key));
            table.apply(Operation::TransactWrite, op)?;
        }

        *tables = staged;
        Ok(())
    }

    async fn batch_write(&self, table_name: &str, mut ops: Vec<WriteOp>) -> Result<BatchWriteResponse, StoreError> {
        self.begin(StoreCall::BatchWrite {
            table_name: table_name.to_string(),
            ops: ops.clone(),
        })
        .await?;

        if ops.len() > BATCH_WRITE_LIMIT {
            return Err(rejected(
                Operation::BatchWrite,
                format!(
                    "ValidationException: {} writes exceed the batch limit of {BATCH_WRITE_LIMIT}",
                    ops.len()
                ),
            ));
        }

        let unprocessed = {
            let mut faults = self.faults.lock().await;
            if faults.unprocessed_calls > 0 {
                faults.unprocessed_calls -= 1;
                let keep = ops.len().saturating_sub(faults.unprocessed_per_call);
                ops.split_off(keep)
            } else {
                Vec::new()
            }
        };

        let mut tables = self.tables.write().await;
        let table = lookup_mut(&mut tables, Operation::BatchWrite, table_name)?;
        for op in ops {
            table.apply(Operation::BatchWrite, op)?;
        }

        Ok(BatchWriteResponse { unprocessed })
    }
}

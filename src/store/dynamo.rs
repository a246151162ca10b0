use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    Delete, DeleteRequest, Put, PutRequest, ReturnConsumedCapacity, ReturnValue, Select,
    TransactWriteItem, WriteRequest,
};
use aws_sdk_dynamodb::Client;
use aws_types::SdkConfig;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::expression::ExpressionCompiler;
use crate::store::{BatchWriteResponse, Page, QueryRequest, ScanRequest, Store, UpdateRequest, WriteOp};
use crate::table::Item;

/// [`Store`] backed by Amazon DynamoDB
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Wraps an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from an AWS SDK config
    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }

    /// Loads the AWS configuration described by `config` and builds a client from it
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use balerial_dynamo::{DynamoStore, StoreConfig};
    ///
    /// # async fn example() {
    /// let store = DynamoStore::connect(&StoreConfig::from_env()).await;
    /// # let _ = store;
    /// # }
    /// ```
    pub async fn connect(config: &StoreConfig) -> Self {
        Self::from_sdk_config(&config.load_sdk_config().await)
    }

    /// Underlying SDK client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn write_request(op: WriteOp) -> Result<WriteRequest, StoreError> {
    Ok(match op {
        WriteOp::Put { item, .. } => WriteRequest::builder()
            .put_request(PutRequest::builder().set_item(Some(item)).build()?)
            .build(),
        WriteOp::Delete { key, .. } => WriteRequest::builder()
            .delete_request(DeleteRequest::builder().set_key(Some(key)).build()?)
            .build(),
    })
}

fn write_op(table_name: &str, request: WriteRequest) -> Option<WriteOp> {
    if let Some(put) = request.put_request {
        return Some(WriteOp::Put {
            table_name: table_name.to_string(),
            item: put.item,
        });
    }

    request.delete_request.map(|delete| WriteOp::Delete {
        table_name: table_name.to_string(),
        key: delete.key,
    })
}

fn transact_item(op: WriteOp) -> Result<TransactWriteItem, StoreError> {
    Ok(match op {
        WriteOp::Put { table_name, item } => TransactWriteItem::builder()
            .put(
                Put::builder()
                    .table_name(table_name)
                    .set_item(Some(item))
                    .build()?,
            )
            .build(),
        WriteOp::Delete { table_name, key } => TransactWriteItem::builder()
            .delete(
                Delete::builder()
                    .table_name(table_name)
                    .set_key(Some(key))
                    .build()?,
            )
            .build(),
    })
}

#[async_trait]
impl Store for DynamoStore {
    async fn query(&self, request: QueryRequest) -> Result<Page, StoreError> {
        let mut compiler = ExpressionCompiler::new();
        let key_condition = compiler.key_condition(&request.key_condition);
        let filter = compiler.filter(&request.filters);
        let projection = compiler.projection(&request.projection);
        let (names, values) = compiler.into_attribute_maps();

        // Secondary indexes only expose their projected attributes; DynamoDB rejects AllAttributes.
        let select = if projection.is_some() {
            Select::SpecificAttributes
        } else if request.index_name.is_some() {
            Select::AllProjectedAttributes
        } else {
            Select::AllAttributes
        };

        let output = self
            .client
            .query()
            .table_name(request.table_name)
            .set_index_name(request.index_name)
            .select(select)
            .key_condition_expression(key_condition)
            .set_filter_expression(filter)
            .set_projection_expression(projection)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .scan_index_forward(request.scan_index_forward)
            .set_limit(request.limit)
            .set_exclusive_start_key(request.exclusive_start_key)
            .set_return_consumed_capacity(None)
            .send()
            .await?;

        Ok(Page {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page, StoreError> {
        let mut compiler = ExpressionCompiler::new();
        let filter = compiler.filter(&request.filters);
        let projection = compiler.projection(&request.projection);
        let (names, values) = compiler.into_attribute_maps();

        let output = self
            .client
            .scan()
            .table_name(request.table_name)
            .set_index_name(request.index_name)
            .set_filter_expression(filter)
            .set_projection_expression(projection)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .set_limit(request.limit)
            .set_exclusive_start_key(request.exclusive_start_key)
            .set_return_consumed_capacity(None)
            .send()
            .await?;

        Ok(Page {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(table_name)
            .set_key(Some(key))
            .set_return_consumed_capacity(None)
            .send()
            .await?;

        Ok(output.item)
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError> {
        let _ = self
            .client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item))
            .return_values(ReturnValue::None)
            .return_consumed_capacity(ReturnConsumedCapacity::None)
            .send()
            .await?;

        Ok(())
    }

    async fn update_item(&self, request: UpdateRequest) -> Result<(), StoreError> {
        let mut compiler = ExpressionCompiler::new();
        let update_expression = compiler.update(&request.assignments);
        let (names, values) = compiler.into_attribute_maps();

        let _ = self
            .client
            .update_item()
            .table_name(request.table_name)
            .set_key(Some(request.key))
            .update_expression(update_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .set_return_values(Some(ReturnValue::None))
            .set_return_consumed_capacity(None)
            .send()
            .await?;

        Ok(())
    }

    async fn delete_item(&self, table_name: &str, key: Item) -> Result<(), StoreError> {
        let _ = self
            .client
            .delete_item()
            .table_name(table_name)
            .set_key(Some(key))
            .set_return_consumed_capacity(None)
            .send()
            .await?;

        Ok(())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let items = ops
            .into_iter()
            .map(transact_item)
            .collect::<Result<Vec<_>, _>>()?;

        let _ = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await?;

        Ok(())
    }

    async fn batch_write(&self, table_name: &str, ops: Vec<WriteOp>) -> Result<BatchWriteResponse, StoreError> {
        let requests = ops
            .into_iter()
            .map(write_request)
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table_name, requests)
            .send()
            .await?;

        let unprocessed = output
            .unprocessed_items
            .unwrap_or_default()
            .into_iter()
            .flat_map(|(table, requests)| {
                requests
                    .into_iter()
                    .filter_map(move |request| write_op(&table, request))
            })
            .collect();

        Ok(BatchWriteResponse { unprocessed })
    }
}

use futures_util::stream::{self, Stream};
use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_dynamo::{from_item, from_items, to_item};

use crate::error::Error;
use crate::expression::{merge_filters, AttributePath, FilterElement, KeyCondition, Predicate};
use crate::repository::{QueryOptions, Record, Repository, ScanOptions};
use crate::store::{Operation, QueryRequest, ScanRequest, Store, UpdateRequest, WriteOp};
use crate::table::{Item, PageKey, PaginatedResult, Scalar};

fn predicates(filters: Vec<&FilterElement>) -> Result<Vec<Predicate>, Error> {
    filters.into_iter().map(FilterElement::to_predicate).collect()
}

impl<T, S> Repository<T, S>
where
    T: Record,
    S: Store,
{
    fn query_request(
        &self,
        index: Option<&str>,
        partition_value: &Scalar,
        options: &QueryOptions,
        limit: Option<i32>,
        exclusive_start_key: Option<Item>,
    ) -> Result<QueryRequest, Error> {
        let index = self.table.index(index)?;
        let key_condition = KeyCondition::for_index(index, partition_value, options.sort.as_ref())?;
        let filters = merge_filters(
            self.table.default_filters(),
            &options.filters,
            Some(index.partition_key().name()),
        );

        Ok(QueryRequest {
            table_name: self.table.table_name().to_string(),
            index_name: index.index_name().map(str::to_string),
            key_condition,
            filters: predicates(filters)?,
            projection: Vec::new(),
            scan_index_forward: !options.descending,
            limit,
            exclusive_start_key,
        })
    }

    async fn query_page(&self, request: QueryRequest) -> Result<(Vec<T>, Option<Item>), Error> {
        tracing::debug!(
            table = %request.table_name,
            index = ?request.index_name,
            resumed = request.exclusive_start_key.is_some(),
            "querying page"
        );

        let page = self.checked(Operation::Query, self.store.query(request).await)?;
        let records: Vec<T> = from_items(page.items)?;
        Ok((records, page.last_evaluated_key))
    }

    /// Streams every page of an index read, following continuation keys until the store reports none
    ///
    /// `index` is a secondary index name, `None` reads the table's primary index.
    pub fn pages_by_index<'a>(
        &'a self,
        index: Option<&'a str>,
        partition_value: Scalar,
        options: &'a QueryOptions,
    ) -> impl Stream<Item = Result<Vec<T>, Error>> + 'a {
        stream::try_unfold(Some(None), move |next: Option<Option<Item>>| {
            let partition_value = partition_value.clone();
            async move {
                let Some(exclusive_start_key) = next else {
                    return Ok(None);
                };

                let request = self.query_request(index, &partition_value, options, None, exclusive_start_key)?;
                let (records, last_evaluated_key) = self.query_page(request).await?;
                Ok::<_, Error>(Some((records, last_evaluated_key.map(Some))))
            }
        })
    }

    /// Reads every record of an index partition
    ///
    /// Records come back in sort-key order, descending unless the options say
    /// otherwise. Filters on the index partition key are dropped.
    pub async fn get_by_index(
        &self,
        index: Option<&str>,
        partition_value: impl Into<Scalar>,
        options: &QueryOptions,
    ) -> Result<Vec<T>, Error> {
        self.pages_by_index(index, partition_value.into(), options)
            .try_concat()
            .await
    }

    /// Reads one page of an index partition
    ///
    /// Pass the previous page's `end_key` as `start_key` to continue.
    pub async fn get_by_index_paginated(
        &self,
        index: Option<&str>,
        partition_value: impl Into<Scalar>,
        start_key: Option<PageKey>,
        options: &QueryOptions,
    ) -> Result<PaginatedResult<T>, Error> {
        if self.config.page_size < 1 {
            return Err(Error::Configuration(format!(
                "page size must be positive, got {}",
                self.config.page_size
            )));
        }

        let request = self.query_request(
            index,
            &partition_value.into(),
            options,
            Some(self.config.page_size),
            start_key.map(PageKey::into_item),
        )?;

        let (elements, last_evaluated_key) = self.query_page(request).await?;
        Ok(PaginatedResult {
            elements,
            end_key: last_evaluated_key.map(PageKey::from_item),
        })
    }

    /// Reads one page of a scan into whole records
    pub async fn scan(&self, options: &ScanOptions) -> Result<PaginatedResult<T>, Error> {
        self.scan_projected(options).await
    }

    /// Reads one page of a scan into a partial record type
    ///
    /// Use with a projection; `P` only needs the projected attributes.
    pub async fn scan_projected<P>(&self, options: &ScanOptions) -> Result<PaginatedResult<P>, Error>
    where
        P: DeserializeOwned,
    {
        if let Some(limit) = options.limit.filter(|limit| *limit < 1) {
            return Err(Error::UnsupportedQuery(format!("scan limit must be positive, got {limit}")));
        }

        let index = self.table.index(options.index.as_deref())?;
        let filters = merge_filters(self.table.default_filters(), &options.filters, None);

        let request = ScanRequest {
            table_name: self.table.table_name().to_string(),
            index_name: index.index_name().map(str::to_string),
            filters: predicates(filters)?,
            projection: options
                .projection
                .iter()
                .map(|path| AttributePath::parse(path))
                .collect(),
            limit: options.limit,
            exclusive_start_key: options.start_key.clone().map(PageKey::into_item),
        };

        tracing::debug!(
            table = %request.table_name,
            index = ?request.index_name,
            resumed = request.exclusive_start_key.is_some(),
            "scanning page"
        );

        let page = self.checked(Operation::Scan, self.store.scan(request).await)?;
        Ok(PaginatedResult {
            elements: from_items(page.items)?,
            end_key: page.last_evaluated_key.map(PageKey::from_item),
        })
    }

    /// Reads every record of an index partition whose `attribute` contains `query`
    ///
    /// `attribute` may be a dot path into nested maps. `query` is matched as given;
    /// normalize it the same way the stored search attribute is.
    pub async fn search(
        &self,
        index: Option<&str>,
        partition_value: impl Into<Scalar>,
        attribute: &str,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<T>, Error> {
        let options = options.clone().filter(FilterElement::contains(attribute, query));
        self.get_by_index(index, partition_value, &options).await
    }

    /// Like [`search`](Self::search) on an attribute nested in maps, given outermost segment first
    pub async fn search_in_nested_fields(
        &self,
        index: Option<&str>,
        partition_value: impl Into<Scalar>,
        path: &[&str],
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<T>, Error> {
        if path.is_empty() || path.iter().any(|segment| segment.is_empty()) {
            return Err(Error::UnsupportedExpression(format!(
                "invalid nested search path {path:?}"
            )));
        }

        let options = options.clone().filter(FilterElement::contains(path.join("."), query));
        self.get_by_index(index, partition_value, &options).await
    }

    /// Reads one record by primary key
    pub async fn get(
        &self,
        partition_value: impl Into<Scalar>,
        sort_value: Option<Scalar>,
    ) -> Result<Option<T>, Error> {
        let key = self.table.primary_key(&partition_value.into(), sort_value.as_ref())?;
        let item = self.checked(
            Operation::GetItem,
            self.store.get_item(self.table.table_name(), key).await,
        )?;

        Ok(item.map(from_item).transpose()?)
    }

    /// Replaces a record unconditionally
    pub async fn put(&self, record: &T) -> Result<(), Error> {
        let item: Item = to_item(record)?;
        let _ = self.table.primary_key_of(&item)?;

        self.checked(
            Operation::PutItem,
            self.store.put_item(self.table.table_name(), item).await,
        )
    }

    /// Sets the serialized fields of `fields` on one record
    ///
    /// Key attributes are immutable: a field named like a primary key attribute
    /// fails with [`Error::InvariantViolation`] before anything is written. Use
    /// [`update_full_object`](Self::update_full_object) to change a key.
    pub async fn update_fields<F>(
        &self,
        partition_value: impl Into<Scalar>,
        fields: &F,
        sort_value: Option<Scalar>,
    ) -> Result<(), Error>
    where
        F: Serialize + ?Sized,
    {
        let fields: Item = to_item(fields)?;
        let primary = self.table.primary_index();

        if let Some(name) = primary.key_names().find(|name| fields.contains_key(*name)) {
            return Err(Error::InvariantViolation(format!(
                "{name} is a key attribute of table {} and cannot be updated in place",
                self.table.table_name()
            )));
        }
        if fields.is_empty() {
            return Err(Error::UnsupportedExpression(format!(
                "update of table {} without fields",
                self.table.table_name()
            )));
        }

        let key = self.table.primary_key(&partition_value.into(), sort_value.as_ref())?;

        let mut assignments: Vec<_> = fields.into_iter().collect();
        assignments.sort_by(|a, b| a.0.cmp(&b.0));

        self.checked(
            Operation::UpdateItem,
            self.store
                .update_item(UpdateRequest {
                    table_name: self.table.table_name().to_string(),
                    key,
                    assignments,
                })
                .await,
        )
    }

    /// Replaces `old` with `new`, atomically when the primary key changes
    ///
    /// A changed key is written as one transaction deleting the old item and
    /// putting the new one; if the store rejects it, the old record is left intact.
    pub async fn update_full_object(&self, old: &T, new: &T) -> Result<(), Error> {
        let old_key = self.table.primary_key_of(&to_item(old)?)?;
        let new_item: Item = to_item(new)?;
        let new_key = self.table.primary_key_of(&new_item)?;
        let table_name = self.table.table_name();

        if old_key == new_key {
            return self.checked(
                Operation::PutItem,
                self.store.put_item(table_name, new_item).await,
            );
        }

        let ops = vec![
            WriteOp::Delete {
                table_name: table_name.to_string(),
                key: old_key,
            },
            WriteOp::Put {
                table_name: table_name.to_string(),
                item: new_item,
            },
        ];

        self.checked(Operation::TransactWrite, self.store.transact_write(ops).await)
    }

    /// Deletes one record by primary key
    pub async fn delete(&self, partition_value: impl Into<Scalar>, sort_value: Option<Scalar>) -> Result<(), Error> {
        let key = self.table.primary_key(&partition_value.into(), sort_value.as_ref())?;

        self.checked(
            Operation::DeleteItem,
            self.store.delete_item(self.table.table_name(), key).await,
        )
    }
}

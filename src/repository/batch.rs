use serde_dynamo::to_item;
use tokio::time::sleep;

use crate::error::{Error, StoreError};
use crate::repository::{Record, Repository};
use crate::store::{Operation, Store, WriteOp};
use crate::table::{Item, Scalar};

/// Largest number of writes DynamoDB accepts in one BatchWriteItem call
const BATCH_WRITE_LIMIT: usize = 25;

impl<T, S> Repository<T, S>
where
    T: Record,
    S: Store,
{
    /// Puts many records in sequential batches of at most 25
    ///
    /// Writes the store leaves unprocessed are resent with exponential backoff
    /// per [`RepositoryConfig::batch_retries`](crate::RepositoryConfig::batch_retries).
    /// The first failing chunk aborts the remaining ones.
    pub async fn batch_put(&self, records: &[T]) -> Result<(), Error> {
        let table_name = self.table.table_name();
        let ops = records
            .iter()
            .map(|record| -> Result<WriteOp, Error> {
                let item: Item = to_item(record)?;
                let _ = self.table.primary_key_of(&item)?;
                Ok(WriteOp::Put {
                    table_name: table_name.to_string(),
                    item,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.write_batches(ops).await
    }

    /// Deletes many records by `(partition, sort)` key in sequential batches of at most 25
    ///
    /// Same chunking and retry rules as [`batch_put`](Self::batch_put).
    pub async fn batch_delete(&self, keys: &[(Scalar, Option<Scalar>)]) -> Result<(), Error> {
        let table_name = self.table.table_name();
        let ops = keys
            .iter()
            .map(|(partition_value, sort_value)| -> Result<WriteOp, Error> {
                Ok(WriteOp::Delete {
                    table_name: table_name.to_string(),
                    key: self.table.primary_key(partition_value, sort_value.as_ref())?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.write_batches(ops).await
    }

    async fn write_batches(&self, ops: Vec<WriteOp>) -> Result<(), Error> {
        let table_name = self.table.table_name();
        let retries = &self.config.batch_retries;

        for (chunk_number, chunk) in ops.chunks(BATCH_WRITE_LIMIT).enumerate() {
            tracing::debug!(table = table_name, chunk = chunk_number, size = chunk.len(), "writing batch");

            let mut pending = chunk.to_vec();
            let mut attempts = 0;

            loop {
                attempts += 1;
                let response = self.checked(
                    Operation::BatchWrite,
                    self.store.batch_write(table_name, pending).await,
                )?;

                if response.unprocessed.is_empty() {
                    break;
                }
                pending = response.unprocessed;

                if attempts > retries.max_retries {
                    let error = StoreError::Unprocessed {
                        count: pending.len(),
                        attempts,
                    };
                    self.log_store_error(Operation::BatchWrite, &error);
                    return Err(error.into());
                }

                let delay = retries.delay(attempts - 1);
                tracing::warn!(
                    table = table_name,
                    chunk = chunk_number,
                    unprocessed = pending.len(),
                    attempt = attempts,
                    ?delay,
                    "resending unprocessed batch writes"
                );
                sleep(delay).await;
            }
        }

        Ok(())
    }
}

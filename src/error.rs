use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use serde_dynamo::Error as SerdeDynamoError;
use thiserror::Error;

use crate::store::Operation;

type DynamoQueryError = SdkError<QueryError, Response>;
type DynamoScanError = SdkError<ScanError, Response>;
type DynamoGetError = SdkError<GetItemError, Response>;
type DynamoPutError = SdkError<PutItemError, Response>;
type DynamoUpdateError = SdkError<UpdateItemError, Response>;
type DynamoDeleteItemError = SdkError<DeleteItemError, Response>;
type DynamoTransactWriteError = SdkError<TransactWriteItemsError, Response>;
type DynamoBatchWriteItemError = SdkError<BatchWriteItemError, Response>;
type DynamoCreateTableError = SdkError<CreateTableError, Response>;

/// Repository operation error
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed table descriptor or builder misuse
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A named element (e.g. a secondary index) was never registered
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What was looked up
        kind: &'static str,
        /// The name that was not found
        name: String,
    },
    /// Attempt to rewrite a key attribute, or a required key value is missing
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// Query shape the index cannot serve
    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),
    /// Filter expression that cannot be compiled
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),
    /// Failure reported by the underlying store
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Serde DynamoDB serialization/deserialization error
    #[error("DynamoDB serialization error: {0}")]
    SerdeDynamo(#[from] SerdeDynamoError),
}

impl Error {
    /// Check if the error is a conditional check or transaction cancellation reported by the store
    ///
    /// The original record is intact in that case; callers typically reload and retry.
    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, Error::Store(store) if store.is_conditional_check_failed())
    }

    /// Check if the error is a serialization/deserialization error
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::SerdeDynamo(_))
    }

    /// Check if the error came from the underlying store
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}

/// Failure of a store call, propagated unchanged by the repository
#[derive(Debug, Error)]
pub enum StoreError {
    /// DynamoDB Query operation error
    #[error("DynamoDB Query operation failed: {0}")]
    Query(#[from] DynamoQueryError),
    /// DynamoDB Scan operation error
    #[error("DynamoDB Scan operation failed: {0}")]
    Scan(#[from] DynamoScanError),
    /// DynamoDB GetItem operation error
    #[error("DynamoDB GetItem operation failed: {0}")]
    GetItem(#[from] DynamoGetError),
    /// DynamoDB PutItem operation error
    #[error("DynamoDB PutItem operation failed: {0}")]
    PutItem(#[from] DynamoPutError),
    /// DynamoDB UpdateItem operation error
    #[error("DynamoDB UpdateItem operation failed: {0}")]
    UpdateItem(#[from] DynamoUpdateError),
    /// DynamoDB DeleteItem operation error
    #[error("DynamoDB DeleteItem operation failed: {0}")]
    DeleteItem(#[from] DynamoDeleteItemError),
    /// DynamoDB TransactWriteItems operation error
    #[error("DynamoDB TransactWriteItems operation failed: {0}")]
    TransactWriteItems(#[from] DynamoTransactWriteError),
    /// DynamoDB BatchWriteItem operation error
    #[error("DynamoDB BatchWriteItem operation failed: {0}")]
    BatchWriteItem(#[from] DynamoBatchWriteItemError),
    /// DynamoDB CreateTable operation error
    #[error("DynamoDB CreateTable operation failed: {0}")]
    CreateTable(#[from] DynamoCreateTableError),
    /// DynamoDB request builder error
    #[error("DynamoDB request builder error: {0}")]
    Build(#[from] BuildError),
    /// Batch-write requests the store kept returning as unprocessed
    #[error("{count} batch write request(s) still unprocessed after {attempts} attempt(s)")]
    Unprocessed {
        /// Number of requests left unprocessed
        count: usize,
        /// Number of batch-write calls made for the chunk
        attempts: usize,
    },
    /// Rejection reported by a non-SDK store
    #[error("{operation} rejected: {message}")]
    Rejected {
        /// Store call that was rejected
        operation: Operation,
        /// Store-provided reason
        message: String,
        /// Whether the rejection is a failed condition or cancelled transaction
        conditional: bool,
    },
}

impl StoreError {
    /// Check if the store rejected the call because a condition or transaction did not hold
    pub fn is_conditional_check_failed(&self) -> bool {
        match self {
            StoreError::PutItem(e) => matches!(
                e.as_service_error(),
                Some(PutItemError::ConditionalCheckFailedException(_))
            ),
            StoreError::UpdateItem(e) => matches!(
                e.as_service_error(),
                Some(UpdateItemError::ConditionalCheckFailedException(_))
            ),
            StoreError::DeleteItem(e) => matches!(
                e.as_service_error(),
                Some(DeleteItemError::ConditionalCheckFailedException(_))
            ),
            StoreError::TransactWriteItems(e) => matches!(
                e.as_service_error(),
                Some(TransactWriteItemsError::TransactionCanceledException(_))
            ),
            StoreError::Rejected { conditional, .. } => *conditional,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_serialization_error() {
        let err = Error::Store(StoreError::Build(BuildError::other("test")));
        assert!(!err.is_serialization_error());
        assert!(err.is_store_error());
    }

    #[test]
    fn test_error_conversion() {
        let err: StoreError = BuildError::other("test").into();
        assert!(matches!(err, StoreError::Build(_)));

        let err: Error = err.into();
        assert!(matches!(err, Error::Store(StoreError::Build(_))));
    }

    #[test]
    fn test_rejected_conditional() {
        let err = Error::Store(StoreError::Rejected {
            operation: Operation::TransactWrite,
            message: "condition failed".to_string(),
            conditional: true,
        });
        assert!(err.is_conditional_check_failed());
        assert_eq!(err.to_string(), "TransactWriteItems rejected: condition failed");
    }

    #[test]
    fn test_display() {
        let err = Error::NotFound {
            kind: "secondary index",
            name: "byStatus".to_string(),
        };
        assert_eq!(err.to_string(), "secondary index not found: byStatus");

        let err = StoreError::Unprocessed {
            count: 3,
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "3 batch write request(s) still unprocessed after 3 attempt(s)"
        );
    }
}

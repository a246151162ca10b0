use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, KeyType as KeySchemaType, Projection,
    ProjectionType, ProvisionedThroughput,
};
use std::collections::BTreeMap;

use crate::error::{Error, StoreError};
use crate::store::DynamoStore;
use crate::table::{Index, KeyAttribute, TableDescriptor};

fn key_schema(index: &Index) -> Result<Vec<KeySchemaElement>, StoreError> {
    let mut schema = vec![KeySchemaElement::builder()
        .attribute_name(index.partition_key().name())
        .key_type(KeySchemaType::Hash)
        .build()?];

    if let Some(sort_key) = index.sort_key() {
        schema.push(
            KeySchemaElement::builder()
                .attribute_name(sort_key.name())
                .key_type(KeySchemaType::Range)
                .build()?,
        );
    }

    Ok(schema)
}

fn throughput() -> Result<ProvisionedThroughput, StoreError> {
    Ok(ProvisionedThroughput::builder()
        .read_capacity_units(10)
        .write_capacity_units(10)
        .build()?)
}

/// Attribute definitions of every key attribute, one per name
///
/// Fails when two indexes declare the same attribute with different types.
fn attribute_definitions(table: &TableDescriptor) -> Result<Vec<AttributeDefinition>, Error> {
    let mut keys: BTreeMap<&str, &KeyAttribute> = BTreeMap::new();
    let indexes = std::iter::once(table.primary_index()).chain(table.secondary_indexes());

    for key in indexes.flat_map(|index| std::iter::once(index.partition_key()).chain(index.sort_key())) {
        if let Some(previous) = keys.insert(key.name(), key) {
            if previous.key_type() != key.key_type() {
                return Err(Error::Configuration(format!(
                    "attribute {} of table {} is declared as both {:?} and {:?}",
                    key.name(),
                    table.table_name(),
                    previous.key_type(),
                    key.key_type()
                )));
            }
        }
    }

    keys.values()
        .map(|key| {
            AttributeDefinition::builder()
                .attribute_name(key.name())
                .attribute_type(key.key_type().scalar_attribute_type())
                .build()
                .map_err(|e| Error::Store(e.into()))
        })
        .collect()
}

/// Creates the DynamoDB table described by `table`
///
/// Secondary indexes become global secondary indexes projecting all attributes.
/// An already existing table is left untouched and is not an error.
pub async fn create_table(store: &DynamoStore, table: &TableDescriptor) -> Result<(), Error> {
    let mut builder = store
        .client()
        .create_table()
        .table_name(table.table_name())
        .set_key_schema(Some(key_schema(table.primary_index())?))
        .set_attribute_definitions(Some(attribute_definitions(table)?))
        .provisioned_throughput(throughput()?);

    for index in table.secondary_indexes() {
        let Some(index_name) = index.index_name() else {
            continue;
        };

        builder = builder.global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(index_name)
                .set_key_schema(Some(key_schema(index)?))
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .provisioned_throughput(throughput()?)
                .build()
                .map_err(StoreError::from)?,
        );
    }

    match builder.send().await {
        Ok(_) => {
            tracing::info!(table = table.table_name(), "table created");
            Ok(())
        }
        Err(e) if matches!(e.as_service_error(), Some(CreateTableError::ResourceInUseException(_))) => {
            tracing::debug!(table = table.table_name(), "table already exists");
            Ok(())
        }
        Err(e) => Err(StoreError::from(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_definitions_deduplicated() {
        let table = TableDescriptor::builder()
            .table_name("orders")
            .primary_index(KeyAttribute::string("uuid"), None)
            .secondary_index("byStatus", KeyAttribute::string("status"), Some(KeyAttribute::number("timestamp")))
            .secondary_index("byCustomer", KeyAttribute::string("customerId"), Some(KeyAttribute::number("timestamp")))
            .build()
            .unwrap();

        let names: Vec<String> = attribute_definitions(&table)
            .unwrap()
            .into_iter()
            .map(|definition| definition.attribute_name)
            .collect();
        assert_eq!(names, ["customerId", "status", "timestamp", "uuid"]);
    }

    #[test]
    fn test_attribute_definitions_conflicting_types() {
        let table = TableDescriptor::builder()
            .table_name("orders")
            .primary_index(KeyAttribute::string("uuid"), None)
            .secondary_index("byTimestamp", KeyAttribute::string("timestamp"), None)
            .secondary_index("byStatus", KeyAttribute::string("status"), Some(KeyAttribute::number("timestamp")))
            .build()
            .unwrap();

        assert!(matches!(
            attribute_definitions(&table),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_key_schema_with_sort_key() {
        let index = Index::secondary("byStatus", KeyAttribute::string("status"), Some(KeyAttribute::number("timestamp")));
        let schema = key_schema(&index).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].key_type, KeySchemaType::Hash);
        assert_eq!(schema[1].attribute_name, "timestamp");
    }
}

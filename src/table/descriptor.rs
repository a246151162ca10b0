use std::collections::BTreeMap;

use crate::error::Error;
use crate::expression::FilterElement;
use crate::table::index::{Index, KeyAttribute};
use crate::table::types::{Item, Scalar};

/// Immutable description of one logical table
///
/// Holds the table name, its primary index, its named secondary indexes and the
/// filters applied to every read. Built once through [`TableDescriptorBuilder`]
/// and shared read-only afterwards.
#[derive(Clone, Debug)]
pub struct TableDescriptor {
    table_name: String,
    primary_index: Index,
    secondary_indexes: BTreeMap<String, Index>,
    default_filters: Vec<FilterElement>,
}

impl TableDescriptor {
    /// Starts a new builder
    pub fn builder() -> TableDescriptorBuilder {
        TableDescriptorBuilder::default()
    }

    /// Table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Primary index
    pub fn primary_index(&self) -> &Index {
        &self.primary_index
    }

    /// Secondary index by name
    pub fn secondary_index(&self, name: &str) -> Result<&Index, Error> {
        self.secondary_indexes
            .get(name)
            .ok_or_else(|| Error::NotFound {
                kind: "secondary index",
                name: format!("{name} on table {}", self.table_name),
            })
    }

    /// All secondary indexes, ordered by name
    pub fn secondary_indexes(&self) -> impl Iterator<Item = &Index> {
        self.secondary_indexes.values()
    }

    /// Filters merged into every read against this table
    pub fn default_filters(&self) -> &[FilterElement] {
        &self.default_filters
    }

    /// Resolves the index a store request names, `None` meaning the primary index
    pub fn index(&self, index_name: Option<&str>) -> Result<&Index, Error> {
        match index_name {
            None => Ok(&self.primary_index),
            Some(name) => self.secondary_index(name),
        }
    }

    /// Builds the primary key of a record from key values
    ///
    /// Fails when the table has a sort key and none is given.
    pub fn primary_key(&self, partition_value: &Scalar, sort_value: Option<&Scalar>) -> Result<Item, Error> {
        let mut key = Item::new();
        let partition_key = self.primary_index.partition_key();
        let _ = key.insert(
            partition_key.name().to_string(),
            partition_key.attribute_value(partition_value),
        );

        match (self.primary_index.sort_key(), sort_value) {
            (Some(sort_key), Some(value)) => {
                let _ = key.insert(sort_key.name().to_string(), sort_key.attribute_value(value));
            }
            (Some(sort_key), None) => {
                return Err(Error::InvariantViolation(format!(
                    "table {} has sort key {} but no sort key value was given",
                    self.table_name,
                    sort_key.name()
                )));
            }
            (None, _) => {}
        }

        Ok(key)
    }

    /// Extracts the primary key attributes of a serialized record
    pub fn primary_key_of(&self, item: &Item) -> Result<Item, Error> {
        self.primary_index
            .key_names()
            .map(|name| {
                item.get(name)
                    .map(|value| (name.to_string(), value.clone()))
                    .ok_or_else(|| {
                        Error::InvariantViolation(format!(
                            "record for table {} is missing key attribute {name}",
                            self.table_name
                        ))
                    })
            })
            .collect()
    }
}

/// Accumulates a table definition and validates it on [`build`](Self::build)
#[derive(Debug, Default)]
pub struct TableDescriptorBuilder {
    table_name: Option<String>,
    primary_index: Option<Index>,
    secondary_indexes: BTreeMap<String, Index>,
    default_filters: Vec<FilterElement>,
}

impl TableDescriptorBuilder {
    /// Sets the table name
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Sets the primary index
    pub fn primary_index(mut self, partition_key: KeyAttribute, sort_key: Option<KeyAttribute>) -> Self {
        self.primary_index = Some(Index::primary(partition_key, sort_key));
        self
    }

    /// Registers a named secondary index
    ///
    /// Registering the same name twice keeps the last definition.
    pub fn secondary_index(
        mut self,
        index_name: impl Into<String>,
        partition_key: KeyAttribute,
        sort_key: Option<KeyAttribute>,
    ) -> Self {
        let index_name = index_name.into();
        let index = Index::secondary(index_name.clone(), partition_key, sort_key);
        if let Some(previous) = self.secondary_indexes.insert(index_name, index) {
            tracing::warn!(
                table = ?self.table_name,
                index = %previous,
                "secondary index registered twice, keeping the last definition"
            );
        }
        self
    }

    /// Sets the filters applied to every read against the table
    pub fn default_filters(mut self, filters: Vec<FilterElement>) -> Self {
        self.default_filters = filters;
        self
    }

    /// Validates and freezes the descriptor
    pub fn build(self) -> Result<TableDescriptor, Error> {
        let table_name = self
            .table_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Configuration("table name is not set".to_string()))?;

        let primary_index = self.primary_index.ok_or_else(|| {
            Error::Configuration(format!("primary index of table {table_name} is not set"))
        })?;

        Ok(TableDescriptor {
            table_name,
            primary_index,
            secondary_indexes: self.secondary_indexes,
            default_filters: self.default_filters,
        })
    }
}

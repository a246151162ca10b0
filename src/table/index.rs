use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
use std::fmt;

use crate::table::types::Scalar;

/// Scalar type of a key attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// String key (`S`)
    String,
    /// Number key (`N`)
    Number,
}

impl KeyType {
    /// Encodes a key value as the attribute type this key is declared with
    pub fn attribute_value(self, value: &Scalar) -> AttributeValue {
        match self {
            KeyType::String => AttributeValue::S(value.to_string()),
            KeyType::Number => AttributeValue::N(value.to_string()),
        }
    }

    pub(crate) fn scalar_attribute_type(self) -> ScalarAttributeType {
        match self {
            KeyType::String => ScalarAttributeType::S,
            KeyType::Number => ScalarAttributeType::N,
        }
    }
}

/// Name and type of one key attribute
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyAttribute {
    name: String,
    key_type: KeyType,
}

impl KeyAttribute {
    /// Key attribute of the given name and type
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
        }
    }

    /// String key attribute
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, KeyType::String)
    }

    /// Number key attribute
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, KeyType::Number)
    }

    /// Attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute type
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Encodes `value` as this key's attribute value
    pub fn attribute_value(&self, value: &Scalar) -> AttributeValue {
        self.key_type.attribute_value(value)
    }
}

/// Whether an index is the table's primary key or a named secondary index
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexKind {
    /// The table's own key schema
    Primary,
    /// A global secondary index and its name
    Secondary(String),
}

/// One access path into a table: a partition key and an optional sort key
///
/// The sort key name and type travel together, so an index either has both or neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Index {
    kind: IndexKind,
    partition_key: KeyAttribute,
    sort_key: Option<KeyAttribute>,
}

impl Index {
    /// The primary index of a table
    pub fn primary(partition_key: KeyAttribute, sort_key: Option<KeyAttribute>) -> Self {
        Self {
            kind: IndexKind::Primary,
            partition_key,
            sort_key,
        }
    }

    /// A named secondary index
    pub fn secondary(
        index_name: impl Into<String>,
        partition_key: KeyAttribute,
        sort_key: Option<KeyAttribute>,
    ) -> Self {
        Self {
            kind: IndexKind::Secondary(index_name.into()),
            partition_key,
            sort_key,
        }
    }

    /// Index kind
    pub fn kind(&self) -> &IndexKind {
        &self.kind
    }

    /// Secondary index name, `None` for the primary index
    pub fn index_name(&self) -> Option<&str> {
        match &self.kind {
            IndexKind::Primary => None,
            IndexKind::Secondary(name) => Some(name),
        }
    }

    /// Returns `true` for the table's primary index
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }

    /// Partition key attribute
    pub fn partition_key(&self) -> &KeyAttribute {
        &self.partition_key
    }

    /// Sort key attribute, if the index has one
    pub fn sort_key(&self) -> Option<&KeyAttribute> {
        self.sort_key.as_ref()
    }

    /// Names of every key attribute of this index
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.name()).chain(self.sort_key.as_ref().map(|k| k.name()))
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IndexKind::Primary => f.write_str("primary")?,
            IndexKind::Secondary(name) => f.write_str(name)?,
        }
        write!(f, "({}", self.partition_key.name())?;
        if let Some(sort_key) = &self.sort_key {
            write!(f, ", {}", sort_key.name())?;
        }
        f.write_str(")")
    }
}

//! Typed filter, sort-key and key-condition model
//!
//! Callers describe reads with [`FilterElement`] and [`SortQuery`]. The engine
//! resolves them into [`Predicate`]s and a [`KeyCondition`], which stores either
//! evaluate directly or render through [`ExpressionCompiler`].

mod compiler;

pub use compiler::{AttributeMaps, ExpressionCompiler};

use aws_sdk_dynamodb::types::AttributeValue;
use std::fmt;

use crate::error::Error;
use crate::table::{Index, Scalar};

/// Comparison applied by a filter element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterExpression {
    /// `attribute = value`
    Equal,
    /// `attribute <> value`
    NotEqual,
    /// `contains(attribute, value)`
    Contains,
    /// `attribute_exists(attribute)`
    AttributeExists,
    /// `attribute_not_exists(attribute)`
    AttributeNotExists,
}

impl FilterExpression {
    /// Whether the expression compares against an operand
    pub fn requires_value(self) -> bool {
        matches!(
            self,
            FilterExpression::Equal | FilterExpression::NotEqual | FilterExpression::Contains
        )
    }
}

/// One filter condition on a (possibly nested, dot-separated) attribute
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FilterElement {
    /// Attribute path, `a.b.c` for nested attributes
    pub attribute: String,
    /// Comparison to apply
    pub expression: FilterExpression,
    /// Operand, required by `Equal`, `NotEqual` and `Contains`
    pub value: Option<Scalar>,
}

impl FilterElement {
    /// Filter element from its raw parts; missing operands are reported when the read is built
    pub fn new(attribute: impl Into<String>, expression: FilterExpression, value: Option<Scalar>) -> Self {
        Self {
            attribute: attribute.into(),
            expression,
            value,
        }
    }

    /// `attribute = value`
    pub fn equal(attribute: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(attribute, FilterExpression::Equal, Some(value.into()))
    }

    /// `attribute <> value`
    pub fn not_equal(attribute: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(attribute, FilterExpression::NotEqual, Some(value.into()))
    }

    /// `contains(attribute, value)`
    pub fn contains(attribute: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(attribute, FilterExpression::Contains, Some(value.into()))
    }

    /// `attribute_exists(attribute)`
    pub fn exists(attribute: impl Into<String>) -> Self {
        Self::new(attribute, FilterExpression::AttributeExists, None)
    }

    /// `attribute_not_exists(attribute)`
    pub fn not_exists(attribute: impl Into<String>) -> Self {
        Self::new(attribute, FilterExpression::AttributeNotExists, None)
    }

    /// Resolves the element into a predicate
    ///
    /// Fails with [`Error::UnsupportedExpression`] when a comparison has no operand.
    pub fn to_predicate(&self) -> Result<Predicate, Error> {
        let path = AttributePath::parse(&self.attribute);
        let operand = || {
            self.value
                .as_ref()
                .map(Scalar::to_attribute_value)
                .ok_or_else(|| {
                    Error::UnsupportedExpression(format!(
                        "{:?} filter on {} requires a value",
                        self.expression, self.attribute
                    ))
                })
        };

        Ok(match self.expression {
            FilterExpression::Equal => Predicate::Equal(path, operand()?),
            FilterExpression::NotEqual => Predicate::NotEqual(path, operand()?),
            FilterExpression::Contains => Predicate::Contains(path, operand()?),
            FilterExpression::AttributeExists => Predicate::Exists(path),
            FilterExpression::AttributeNotExists => Predicate::NotExists(path),
        })
    }
}

/// Condition on the sort key of the queried index
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortQuery {
    /// `sortKey = value`
    Equal(Scalar),
    /// `sortKey BETWEEN start AND end`, both bounds inclusive
    Between {
        /// Lower bound
        start: Scalar,
        /// Upper bound
        end: Scalar,
    },
}

impl SortQuery {
    /// `sortKey = value`
    pub fn equal(value: impl Into<Scalar>) -> Self {
        SortQuery::Equal(value.into())
    }

    /// `sortKey BETWEEN start AND end`
    pub fn between(start: impl Into<Scalar>, end: impl Into<Scalar>) -> Self {
        SortQuery::Between {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Attribute path split into its dot-separated segments
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributePath(Vec<String>);

impl AttributePath {
    /// Splits `a.b.c` into `["a", "b", "c"]`
    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    /// Path segments, outermost first
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Resolved filter condition with its operand already encoded
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `path = value`
    Equal(AttributePath, AttributeValue),
    /// `path <> value`
    NotEqual(AttributePath, AttributeValue),
    /// `contains(path, value)`
    Contains(AttributePath, AttributeValue),
    /// `attribute_exists(path)`
    Exists(AttributePath),
    /// `attribute_not_exists(path)`
    NotExists(AttributePath),
}

impl Predicate {
    /// Path the predicate inspects
    pub fn path(&self) -> &AttributePath {
        match self {
            Predicate::Equal(path, _)
            | Predicate::NotEqual(path, _)
            | Predicate::Contains(path, _)
            | Predicate::Exists(path)
            | Predicate::NotExists(path) => path,
        }
    }
}

/// Sort-key part of a key condition
#[derive(Clone, Debug, PartialEq)]
pub enum SortCondition {
    /// `sortKey = value`
    Equal(String, AttributeValue),
    /// `sortKey BETWEEN start AND end`
    Between(String, AttributeValue, AttributeValue),
}

/// Key condition of a query: partition equality plus an optional sort condition
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition {
    /// Partition key attribute name
    pub partition_key: String,
    /// Partition key value
    pub partition_value: AttributeValue,
    /// Optional sort key condition
    pub sort: Option<SortCondition>,
}

impl KeyCondition {
    /// Builds the key condition of a query against `index`
    ///
    /// Values are encoded with the key types the index declares. A sort query
    /// against an index without a sort key fails with [`Error::UnsupportedQuery`].
    pub fn for_index(index: &Index, partition_value: &Scalar, sort_query: Option<&SortQuery>) -> Result<Self, Error> {
        let partition_key = index.partition_key();

        let sort = match sort_query {
            None => None,
            Some(sort_query) => {
                let sort_key = index.sort_key().ok_or_else(|| {
                    Error::UnsupportedQuery(format!(
                        "index {index} has no sort key to apply {sort_query:?} to"
                    ))
                })?;
                let name = sort_key.name().to_string();

                Some(match sort_query {
                    SortQuery::Equal(value) => SortCondition::Equal(name, sort_key.attribute_value(value)),
                    SortQuery::Between { start, end } => SortCondition::Between(
                        name,
                        sort_key.attribute_value(start),
                        sort_key.attribute_value(end),
                    ),
                })
            }
        };

        Ok(Self {
            partition_key: partition_key.name().to_string(),
            partition_value: partition_key.attribute_value(partition_value),
            sort,
        })
    }
}

/// Merges default and caller filters for a read
///
/// Default filters come first. Duplicates (same attribute, expression and value)
/// are kept once. When `partition_key` is given, every filter on that attribute is
/// dropped, since the key condition already pins it.
pub fn merge_filters<'a>(
    default_filters: &'a [FilterElement],
    filters: &'a [FilterElement],
    partition_key: Option<&str>,
) -> Vec<&'a FilterElement> {
    let mut merged: Vec<&FilterElement> = Vec::with_capacity(default_filters.len() + filters.len());

    for filter in default_filters.iter().chain(filters) {
        if partition_key == Some(filter.attribute.as_str()) {
            continue;
        }
        if !merged.contains(&filter) {
            merged.push(filter);
        }
    }

    merged
}

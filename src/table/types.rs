use aws_sdk_dynamodb::types::AttributeValue;
use std::{collections::HashMap, fmt, time::Duration};

/// A raw DynamoDB item, attribute name to value
pub type Item = HashMap<String, AttributeValue>;

/// Scalar value usable as a key value, a sort-key bound or a filter operand
///
/// Numbers are kept in their decimal string form, the way DynamoDB transports them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// String value
    S(String),
    /// Number value in decimal notation
    N(String),
    /// Boolean value
    Bool(bool),
}

impl Scalar {
    /// Converts the scalar into the attribute value it is compared against
    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Scalar::S(value) => AttributeValue::S(value.clone()),
            Scalar::N(value) => AttributeValue::N(value.clone()),
            Scalar::Bool(value) => AttributeValue::Bool(*value),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::S(value) | Scalar::N(value) => f.write_str(value),
            Scalar::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::S(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::S(value.to_string())
    }
}

impl From<&String> for Scalar {
    fn from(value: &String) -> Self {
        Scalar::S(value.clone())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

macro_rules! impl_number_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::N(value.to_string())
                }
            }
        )*
    };
}

impl_number_scalar!(i32, i64, u32, u64, usize, f64);

/// Opaque pagination cursor
///
/// Returned as `end_key` by paginated reads and replayed verbatim as the start
/// key of the next request.
#[derive(Clone, Debug, PartialEq)]
pub struct PageKey(Item);

impl PageKey {
    /// Wraps a store-native last evaluated key
    pub fn from_item(item: Item) -> Self {
        Self(item)
    }

    /// Borrows the store-native key attributes
    pub fn as_item(&self) -> &Item {
        &self.0
    }

    /// Unwraps into the store-native key attributes
    pub fn into_item(self) -> Item {
        self.0
    }
}

/// One page of results plus the cursor for the next one
#[must_use = "paginated results should be used or you'll lose the fetched data"]
#[derive(Clone, Debug)]
pub struct PaginatedResult<T> {
    /// Records on this page
    pub elements: Vec<T>,
    /// Cursor for the next page, absent when the store reported no more pages
    pub end_key: Option<PageKey>,
}

impl<T> PaginatedResult<T> {
    /// Returns `true` when another page can be requested with `end_key`
    pub fn has_more(&self) -> bool {
        self.end_key.is_some()
    }
}

impl<T> Default for PaginatedResult<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            end_key: None,
        }
    }
}

/// Retry configuration for unprocessed batch-write items
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for the delay between retries
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based), doubling each time and capped at `max_delay`
    pub fn delay(&self, attempt: usize) -> Duration {
        let delay_ms = (self.initial_delay.as_millis() as u64)
            .saturating_mul(2u64.saturating_pow(attempt as u32));
        let capped_delay = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2000),
        }
    }
}

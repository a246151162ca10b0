/// Common test fixtures and data structures
///
/// Defines the records and table descriptors shared by the integration tests.
use super::{Deserialize, Serialize};
use balerial_dynamo::{KeyAttribute, TableDescriptor};

/// Framing order, keyed by `uuid` and indexed by status and customer
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TestOrder {
    pub uuid: String,
    pub status: String,
    pub timestamp: u64,
    pub customer_id: String,
    pub store_id: String,
    pub customer: TestCustomer,
}

/// Customer snapshot embedded in an order
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TestCustomer {
    pub name: String,
    pub search_name: String,
}

/// Projection of [`TestOrder`] used by projected scans
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TestOrderSummary {
    pub uuid: String,
    pub status: String,
}

impl TestOrder {
    pub fn new(uuid: impl Into<String>, status: &str, timestamp: u64) -> Self {
        let uuid = uuid.into();
        Self {
            customer_id: format!("customer-{}", timestamp % 3),
            store_id: "store-1".to_string(),
            customer: TestCustomer {
                name: format!("Customer {timestamp}"),
                search_name: format!("customer{timestamp}"),
            },
            uuid,
            status: status.to_string(),
            timestamp,
        }
    }
}

/// Price list entry, keyed by `storeId` and `type`
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TestPricing {
    pub store_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
}

/// Orders table with a `byStatus` and a `byCustomer` index
pub fn orders_table(table_name: &str) -> TableDescriptor {
    TableDescriptor::builder()
        .table_name(table_name)
        .primary_index(KeyAttribute::string("uuid"), None)
        .secondary_index(
            "byStatus",
            KeyAttribute::string("status"),
            Some(KeyAttribute::number("timestamp")),
        )
        .secondary_index(
            "byCustomer",
            KeyAttribute::string("customerId"),
            Some(KeyAttribute::number("timestamp")),
        )
        .build()
        .unwrap()
}

/// Pricing table with a composite primary key
pub fn pricing_table(table_name: &str) -> TableDescriptor {
    TableDescriptor::builder()
        .table_name(table_name)
        .primary_index(KeyAttribute::string("storeId"), Some(KeyAttribute::string("type")))
        .build()
        .unwrap()
}

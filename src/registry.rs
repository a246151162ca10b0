//! Table layouts of the framing shop
//!
//! Every table name is prefixed with the deployment stage, e.g. `prod-orders`.
//! When a store id is given, every read is scoped to it with a default
//! `storeId` filter.

use crate::error::Error;
use crate::expression::FilterElement;
use crate::table::{KeyAttribute, TableDescriptor};

/// Secondary index of customers by store, newest first
pub const CUSTOMERS_BY_STORE: &str = "byStore";
/// Secondary index of customers by phone number
pub const CUSTOMERS_BY_PHONE: &str = "byPhone";
/// Secondary index of orders by status and creation time
pub const ORDERS_BY_STATUS: &str = "byStatus";
/// Secondary index of orders by customer and creation time
pub const ORDERS_BY_CUSTOMER: &str = "byCustomer";
/// Secondary index of orders by store and creation time
pub const ORDERS_BY_STORE: &str = "byStore";
/// Secondary index of files by order
pub const FILES_BY_ORDER: &str = "byOrder";

/// Descriptors of every table the shop uses
#[derive(Clone, Debug)]
pub struct Tables {
    /// Customers, keyed by `uuid`
    pub customers: TableDescriptor,
    /// Orders, keyed by `uuid`
    pub orders: TableDescriptor,
    /// Uploaded files, keyed by `uuid`
    pub files: TableDescriptor,
    /// Price lists, keyed by `storeId` and `type`
    pub pricing: TableDescriptor,
}

impl Tables {
    /// Builds the descriptors for `stage`, optionally scoped to one store
    pub fn new(stage: &str, store_id: Option<&str>) -> Result<Self, Error> {
        if stage.is_empty() {
            return Err(Error::Configuration("stage is not set".to_string()));
        }

        let scope: Vec<FilterElement> = store_id
            .map(|store_id| FilterElement::equal("storeId", store_id))
            .into_iter()
            .collect();
        let name = |table: &str| format!("{stage}-{table}");

        let customers = TableDescriptor::builder()
            .table_name(name("customers"))
            .primary_index(KeyAttribute::string("uuid"), None)
            .secondary_index(
                CUSTOMERS_BY_STORE,
                KeyAttribute::string("storeId"),
                Some(KeyAttribute::number("creationTimestamp")),
            )
            .secondary_index(CUSTOMERS_BY_PHONE, KeyAttribute::string("phone"), None)
            .default_filters(scope.clone())
            .build()?;

        let orders = TableDescriptor::builder()
            .table_name(name("orders"))
            .primary_index(KeyAttribute::string("uuid"), None)
            .secondary_index(
                ORDERS_BY_STATUS,
                KeyAttribute::string("status"),
                Some(KeyAttribute::number("timestamp")),
            )
            .secondary_index(
                ORDERS_BY_CUSTOMER,
                KeyAttribute::string("customerId"),
                Some(KeyAttribute::number("timestamp")),
            )
            .secondary_index(
                ORDERS_BY_STORE,
                KeyAttribute::string("storeId"),
                Some(KeyAttribute::number("timestamp")),
            )
            .default_filters(scope.clone())
            .build()?;

        let files = TableDescriptor::builder()
            .table_name(name("files"))
            .primary_index(KeyAttribute::string("uuid"), None)
            .secondary_index(
                FILES_BY_ORDER,
                KeyAttribute::string("orderId"),
                Some(KeyAttribute::number("timestamp")),
            )
            .default_filters(scope.clone())
            .build()?;

        let pricing = TableDescriptor::builder()
            .table_name(name("pricing"))
            .primary_index(KeyAttribute::string("storeId"), Some(KeyAttribute::string("type")))
            .default_filters(scope)
            .build()?;

        Ok(Self {
            customers,
            orders,
            files,
            pricing,
        })
    }

    /// Every descriptor, for table setup
    pub fn all(&self) -> [&TableDescriptor; 4] {
        [&self.customers, &self.orders, &self.files, &self.pricing]
    }
}

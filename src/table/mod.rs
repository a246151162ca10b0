mod descriptor;
mod index;
mod types;

pub use descriptor::{TableDescriptor, TableDescriptorBuilder};
pub use index::{Index, IndexKind, KeyAttribute, KeyType};
pub use types::{Item, PageKey, PaginatedResult, RetryConfig, Scalar};

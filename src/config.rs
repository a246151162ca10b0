use aws_config::{BehaviorVersion, Region};
use aws_types::sdk_config::{RetryConfig as SdkRetryConfig, TimeoutConfig};
use aws_types::SdkConfig;
use std::time::Duration;

use crate::table::RetryConfig;

const LOCALSTACK_ENDPOINT: &str = "http://127.0.0.1:4566";

/// Connection parameters of a [`DynamoStore`](crate::DynamoStore)
///
/// The defaults configure:
/// - Adaptive retry mode with 3 max attempts
/// - Exponential backoff starting at 1 second
/// - Connect timeout: 3 seconds
/// - Read timeout: 20 seconds
/// - Operation timeout: 60 seconds
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// AWS region, resolved by the default provider chain when `None`
    pub region: Option<String>,
    /// Endpoint override, e.g. LocalStack or DynamoDB Local
    pub endpoint_url: Option<String>,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// Socket read timeout
    pub read_timeout: Duration,
    /// Whole-operation timeout, retries included
    pub operation_timeout: Duration,
    /// Maximum attempts per request, the first one included
    pub max_attempts: u32,
    /// First retry backoff
    pub initial_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(20),
            operation_timeout: Duration::from_secs(60),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by the environment
    ///
    /// Reads `AWS_REGION` and `DYNAMODB_ENDPOINT_URL`. `AWS_PROFILE=localstack`
    /// points the client at LocalStack unless an explicit endpoint is set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let endpoint_url = non_empty("DYNAMODB_ENDPOINT_URL").or_else(|| {
            (lookup("AWS_PROFILE").as_deref() == Some("localstack")).then(|| LOCALSTACK_ENDPOINT.to_string())
        });

        Self {
            region: non_empty("AWS_REGION"),
            endpoint_url,
            ..Self::default()
        }
    }

    /// Sets the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the endpoint override
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Loads the AWS SDK configuration with these settings applied
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .operation_timeout(self.operation_timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(
                SdkRetryConfig::adaptive()
                    .with_max_attempts(self.max_attempts)
                    .with_initial_backoff(self.initial_backoff),
            )
            .timeout_config(timeout_config);

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        loader.load().await
    }
}

/// Engine settings of a [`Repository`](crate::Repository)
#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    /// Items requested per page by paginated reads
    pub page_size: i32,
    /// Backoff for resending unprocessed batch-write items
    pub batch_retries: RetryConfig,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            page_size: 25,
            batch_retries: RetryConfig::default(),
        }
    }
}

impl RepositoryConfig {
    /// Sets the page size of paginated reads
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the unprocessed-item retry policy
    pub fn with_batch_retries(mut self, batch_retries: RetryConfig) -> Self {
        self.batch_retries = batch_retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.operation_timeout, Duration::from_secs(60));
        assert!(config.endpoint_url.is_none());

        assert_eq!(RepositoryConfig::default().page_size, 25);
    }

    #[test]
    fn test_localstack_profile() {
        let config = StoreConfig::from_lookup(lookup(&[("AWS_PROFILE", "localstack")]));
        assert_eq!(config.endpoint_url.as_deref(), Some(LOCALSTACK_ENDPOINT));
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("AWS_PROFILE", "localstack"),
            ("DYNAMODB_ENDPOINT_URL", "http://localhost:8000"),
            ("AWS_REGION", "eu-west-1"),
        ]));
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_empty_values_ignored() {
        let config = StoreConfig::from_lookup(lookup(&[("AWS_REGION", "")]));
        assert!(config.region.is_none());
    }
}

//! Object store integration
//!
//! The [`ObjectStore`] trait is the only thing workflows and the listing
//! paginator know about the backend. [`S3Store`] talks to any S3-compatible
//! service; [`MockObjectStore`] keeps objects in memory for tests.

pub mod client;
pub mod mock;

pub use client::S3Store;
pub use mock::MockObjectStore;

use crate::config::StorageConfig;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Parameters of one `ListObjectsV2`-style call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: u32,
    pub continuation_token: Option<String>,
}

impl ListRequest {
    pub fn new(max_keys: u32) -> Self {
        Self {
            prefix: None,
            delimiter: None,
            max_keys,
            continuation_token: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawObject {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page exactly as the backend returned it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawListing {
    pub objects: Vec<RawObject>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;
    async fn copy_object(&self, source_key: &str, target_key: &str) -> Result<()>;
    async fn delete_object(&self, key: &str) -> Result<()>;
    async fn list_objects_page(&self, request: &ListRequest) -> Result<RawListing>;
}

/// Public URL for keys in the configured bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    base: String,
}

impl UrlTemplate {
    /// Virtual-hosted style: `https://{bucket}.{endpoint host}` for custom
    /// endpoints, `https://{bucket}.s3.{region}.amazonaws.com` otherwise.
    pub fn from_config(config: &StorageConfig) -> Self {
        let base = match config.endpoint.as_deref() {
            Some(endpoint) => {
                let host = endpoint
                    .split_once("://")
                    .map_or(endpoint, |(_, rest)| rest)
                    .trim_end_matches('/');
                format!("https://{}.{}", config.bucket, host)
            }
            None => format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region),
        };
        Self { base }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base, key)
    }
}

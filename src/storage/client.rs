use super::{ListRequest, ObjectStore, RawListing, RawObject};
use crate::config::StorageConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, Client as S3Client};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

pub struct S3Store {
    client: S3Client,
    bucket: String,
}

impl S3Store {
    /// Build a client for `config`. Credentials fall back to the SDK's
    /// default provider chain when the config carries none.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = aws_sdk_s3::config::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "imgre-config",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let client = S3Client::new(&sdk_config);

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }

    fn copy_source(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.bucket, encoded.join("/"))
    }
}

fn backend_error<E>(operation: &'static str, key: &str, err: E) -> Error
where
    E: std::error::Error,
{
    let message = DisplayErrorContext(&err).to_string();
    error!("Error during {} on {}: {}", operation, key, message);
    Error::backend(operation, key, message)
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let body = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| backend_error("put_object", key, e))?;

        debug!("Stored {} bytes at {}", data.len(), key);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend_error("get_object", key, e))?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| backend_error("get_object", key, e))?;

        Ok(bytes.to_vec())
    }

    async fn copy_object(&self, source_key: &str, target_key: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(self.copy_source(source_key))
            .key(target_key)
            .send()
            .await
            .map_err(|e| backend_error("copy_object", source_key, e))?;

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend_error("delete_object", key, e))?;

        info!("Deleted object from S3: {}", key);
        Ok(())
    }

    async fn list_objects_page(&self, request: &ListRequest) -> Result<RawListing> {
        let max_keys = i32::try_from(request.max_keys).unwrap_or(i32::MAX);
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(max_keys)
            .set_prefix(request.prefix.clone())
            .set_delimiter(request.delimiter.clone())
            .set_continuation_token(request.continuation_token.clone())
            .send()
            .await
            .map_err(|e| {
                backend_error(
                    "list_objects",
                    request.prefix.as_deref().unwrap_or(""),
                    e,
                )
            })?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| {
                Some(RawObject {
                    key: obj.key()?.to_string(),
                    size: obj.size().unwrap_or(0),
                    last_modified: obj.last_modified().and_then(to_chrono),
                })
            })
            .collect();

        let common_prefixes = output
            .common_prefixes()
            .iter()
            .filter_map(|cp| cp.prefix().map(str::to_string))
            .collect();

        Ok(RawListing {
            objects,
            common_prefixes,
            is_truncated: output.is_truncated().unwrap_or(false),
            next_token: output.next_continuation_token().map(str::to_string),
        })
    }
}

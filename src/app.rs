//! Upload, copy, list and remove workflows over an object store.

use crate::config::Config;
use crate::image::{detect_image_mime, Codec, ImageCodec, ImageProcessor, TransformRequest};
use crate::keys::{derive_target_key, ensure_distinct};
use crate::listing::{list_page, DEFAULT_DELIMITER, DEFAULT_MAX_KEYS};
use crate::models::{content_type_for_extension, ListingPage, OutputFormat, ResizeMode};
use crate::storage::{ListRequest, ObjectStore, S3Store, UrlTemplate};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Per-call overrides; anything left `None` falls back to the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub resize_mode: Option<ResizeMode>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub key: Option<String>,
    pub compress: bool,
    pub transform: TransformOptions,
}

#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub target: Option<String>,
    /// Server-side copy of the original bytes, no transform.
    pub raw: bool,
    pub transform: TransformOptions,
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: u32,
    pub token: Option<String>,
    /// Ignore the delimiter and list every key under the prefix.
    pub recursive: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            delimiter: Some(DEFAULT_DELIMITER.to_string()),
            max_keys: DEFAULT_MAX_KEYS,
            token: None,
            recursive: false,
        }
    }
}

impl ListOptions {
    fn to_request(&self) -> ListRequest {
        ListRequest {
            prefix: self.prefix.clone(),
            delimiter: if self.recursive {
                None
            } else {
                self.delimiter.clone()
            },
            max_keys: self.max_keys,
            continuation_token: self.token.clone(),
        }
    }
}

/// What a put or copy produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub original_bytes: usize,
    pub stored_bytes: usize,
    pub dimensions: Option<(u32, u32)>,
}

impl StoredImage {
    /// Stored size as a percentage of the original.
    pub fn ratio_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 100.0;
        }
        self.stored_bytes as f64 / self.original_bytes as f64 * 100.0
    }
}

/// Outcome of a batch delete; one failure never stops the rest.
#[derive(Debug, Default)]
pub struct DeleteSummary {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl DeleteSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub store: Box<dyn ObjectStore>,
    pub codec: Arc<dyn Codec>,
}

pub struct App {
    store: Box<dyn ObjectStore>,
    processor: ImageProcessor,
    urls: UrlTemplate,
    config: Config,
}

impl App {
    pub fn with_services(services: AppServices, config: Config) -> Self {
        Self {
            store: services.store,
            processor: ImageProcessor::new(services.codec),
            urls: UrlTemplate::from_config(&config.storage),
            config,
        }
    }

    /// Connect to the configured bucket with the real codec.
    pub async fn new(config: Config) -> Result<Self> {
        let store = S3Store::new(&config.storage).await?;
        info!(
            "Using bucket {} ({})",
            config.storage.bucket,
            config
                .storage
                .endpoint
                .as_deref()
                .unwrap_or(&config.storage.region)
        );
        Ok(Self::with_services(
            AppServices {
                store: Box::new(store),
                codec: Arc::new(ImageCodec::new()),
            },
            config,
        ))
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn url_for(&self, key: &str) -> String {
        self.urls.url_for(key)
    }

    /// Merge per-call overrides with configured defaults.
    pub fn transform_request(&self, options: &TransformOptions) -> TransformRequest {
        let defaults = &self.config.image;
        TransformRequest {
            width: options.width,
            height: options.height,
            format: options.format.unwrap_or(defaults.format),
            quality: options.quality.unwrap_or(defaults.quality),
            resize_mode: options.resize_mode.unwrap_or(defaults.resize_mode),
        }
    }

    async fn transform_and_put(
        &self,
        source: Vec<u8>,
        key: String,
        request: TransformRequest,
    ) -> Result<StoredImage> {
        request.validate()?;
        let original_bytes = source.len();
        let source = Arc::new(source);

        let result = self.processor.process(source, request).await?;
        info!(
            "Processed image: {}x{} -> {}x{} {}, {} bytes",
            result.source_width,
            result.source_height,
            result.width,
            result.height,
            result.format,
            result.byte_length
        );

        self.store
            .put_object(&key, &result.bytes, result.content_type())
            .await?;

        Ok(StoredImage {
            url: self.urls.url_for(&key),
            key,
            content_type: result.content_type().to_string(),
            original_bytes,
            stored_bytes: result.byte_length,
            dimensions: Some((result.width, result.height)),
        })
    }

    /// Upload local bytes named `file_name`, optionally transforming first.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        file_name: &str,
        options: &UploadOptions,
    ) -> Result<StoredImage> {
        let key = options.key.clone().unwrap_or_else(|| file_name.to_string());
        if key.is_empty() {
            return Err(Error::InvalidArgument("object key is empty".to_string()));
        }

        if options.compress {
            let request = self.transform_request(&options.transform);
            let key = derive_target_key(file_name, Some(&key), request.format);
            let stored = self.transform_and_put(data, key, request).await?;
            info!("Uploaded image to: {}", stored.url);
            return Ok(stored);
        }

        let content_type = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(content_type_for_extension)
            .filter(|ct| *ct != "application/octet-stream")
            .or_else(|| detect_image_mime(&data))
            .unwrap_or("application/octet-stream");

        self.store.put_object(&key, &data, content_type).await?;
        let url = self.urls.url_for(&key);
        info!("Uploaded image to: {}", url);

        Ok(StoredImage {
            url,
            key,
            content_type: content_type.to_string(),
            original_bytes: data.len(),
            stored_bytes: data.len(),
            dimensions: None,
        })
    }

    /// Copy `source_key` within the bucket, transforming unless `raw`.
    pub async fn copy(&self, source_key: &str, options: &CopyOptions) -> Result<StoredImage> {
        if options.raw {
            let target = options.target.clone().ok_or_else(|| {
                Error::InvalidArgument("a target key is required for a raw copy".to_string())
            })?;
            ensure_distinct(source_key, &target)?;

            self.store.copy_object(source_key, &target).await?;
            let url = self.urls.url_for(&target);
            info!("Copied object to: {}", url);
            return Ok(StoredImage {
                url,
                content_type: content_type_for_extension(
                    Path::new(&target)
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .unwrap_or(""),
                )
                .to_string(),
                key: target,
                original_bytes: 0,
                stored_bytes: 0,
                dimensions: None,
            });
        }

        let request = self.transform_request(&options.transform);
        let target = derive_target_key(source_key, options.target.as_deref(), request.format);
        ensure_distinct(source_key, &target)?;

        let source = self.store.get_object(source_key).await?;
        let stored = self.transform_and_put(source, target, request).await?;
        info!("Copied and transformed object to: {}", stored.url);
        Ok(stored)
    }

    /// Fetch a single page.
    pub async fn list(&self, options: &ListOptions) -> Result<ListingPage> {
        list_page(self.store.as_ref(), &self.urls, &options.to_request()).await
    }

    /// Follow continuation tokens from `options.token` until the listing ends.
    pub async fn list_all(&self, options: &ListOptions) -> Result<ListingPage> {
        let mut request = options.to_request();
        let mut combined = ListingPage::default();
        loop {
            let page = list_page(self.store.as_ref(), &self.urls, &request).await?;
            combined.objects.extend(page.objects);
            combined.prefixes.extend(page.prefixes);
            match (page.is_truncated, page.next_token) {
                (true, Some(token)) => request.continuation_token = Some(token),
                (true, None) => {
                    warn!("Listing reported truncation without a continuation token");
                    break;
                }
                (false, _) => break,
            }
        }
        Ok(combined)
    }

    /// Delete each key independently and report what happened.
    pub async fn remove(&self, keys: &[String]) -> DeleteSummary {
        let mut summary = DeleteSummary::default();
        for key in keys {
            match self.store.delete_object(key).await {
                Ok(()) => {
                    info!("Deleted object: {}", key);
                    summary.deleted.push(key.clone());
                }
                Err(e) => {
                    error!("Failed to delete {}: {}", key, e);
                    summary.failed.push((key.clone(), e));
                }
            }
        }
        summary
    }
}

//! Configuration loading
//!
//! Settings come from built-in defaults, the first readable `config.toml`
//! found on the search path, and `IMGRE_*` / `AWS_*` environment variables,
//! in that order. [`RawConfig::validate`] turns the merged values into a
//! typed [`Config`] the rest of the crate can trust.

use crate::models::{OutputFormat, ResizeMode};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_FORMAT: &str = "webp";
pub const DEFAULT_QUALITY: i64 = 80;
pub const DEFAULT_RESIZE_MODE: &str = "fit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDefaults {
    pub format: OutputFormat,
    pub quality: u8,
    pub resize_mode: ResizeMode,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageConfig,
    pub image: ImageDefaults,
}

impl Config {
    /// Load from files and environment, then validate.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cwd = std::env::current_dir()?;
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let xdg = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);

        let mut raw = RawConfig::default();
        let paths = config_paths(&cwd, home.as_deref(), xdg.as_deref());
        if let Some(path) = raw.merge_first_file(&paths) {
            debug!("Loaded configuration from {}", path.display());
        }
        raw.apply_env(|name| std::env::var(name).ok())?;
        raw.validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawStorage {
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawImage {
    pub format: String,
    pub quality: i64,
    pub resize_mode: String,
}

impl Default for RawImage {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            quality: DEFAULT_QUALITY,
            resize_mode: DEFAULT_RESIZE_MODE.to_string(),
        }
    }
}

/// Unvalidated settings as read from `[s3]` and `[image]` tables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawConfig {
    pub s3: RawStorage,
    pub image: RawImage,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            s3: RawStorage {
                region: Some(DEFAULT_REGION.to_string()),
                ..RawStorage::default()
            },
            image: RawImage::default(),
        }
    }
}

impl RawConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Overlay the keys present in a config file onto `self`.
    fn overlay_file(&mut self, contents: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(contents)?;
        let s3 = file.s3;
        if s3.bucket.is_some() {
            self.s3.bucket = s3.bucket;
        }
        if s3.endpoint.is_some() {
            self.s3.endpoint = s3.endpoint;
        }
        if s3.region.is_some() {
            self.s3.region = s3.region;
        }
        if s3.access_key.is_some() {
            self.s3.access_key = s3.access_key;
        }
        if s3.secret_key.is_some() {
            self.s3.secret_key = s3.secret_key;
        }
        if let Some(format) = file.image.format {
            self.image.format = format;
        }
        if let Some(quality) = file.image.quality {
            self.image.quality = quality;
        }
        if let Some(mode) = file.image.resize_mode {
            self.image.resize_mode = mode;
        }
        Ok(())
    }

    /// Merge the first existing, parseable file in `paths`. Returns its path.
    pub fn merge_first_file(&mut self, paths: &[PathBuf]) -> Option<PathBuf> {
        for path in paths.iter().filter(|p| p.exists()) {
            let loaded = std::fs::read_to_string(path)
                .map_err(Error::from)
                .and_then(|contents| self.overlay_file(&contents));
            match loaded {
                Ok(()) => return Some(path.clone()),
                Err(e) => warn!("Error loading config from {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Apply `IMGRE_*` overrides, then fill credentials and region from `AWS_*`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("IMGRE_S3_BUCKET") {
            self.s3.bucket = Some(v);
        }
        if let Some(v) = lookup("IMGRE_S3_ENDPOINT") {
            self.s3.endpoint = Some(v);
        }
        if let Some(v) = lookup("IMGRE_S3_REGION") {
            self.s3.region = Some(v);
        }
        if let Some(v) = lookup("IMGRE_S3_ACCESS_KEY") {
            self.s3.access_key = Some(v);
        }
        if let Some(v) = lookup("IMGRE_S3_SECRET_KEY") {
            self.s3.secret_key = Some(v);
        }
        if let Some(v) = lookup("IMGRE_IMAGE_FORMAT") {
            self.image.format = v;
        }
        if let Some(v) = lookup("IMGRE_IMAGE_QUALITY") {
            self.image.quality = v.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "Invalid quality value: {}. Must be an integer between 1 and 100",
                    v
                ))
            })?;
        }
        if let Some(v) = lookup("IMGRE_IMAGE_RESIZE_MODE") {
            self.image.resize_mode = v;
        }

        if is_blank(&self.s3.access_key) {
            self.s3.access_key = lookup("AWS_ACCESS_KEY_ID");
        }
        if is_blank(&self.s3.secret_key) {
            self.s3.secret_key = lookup("AWS_SECRET_ACCESS_KEY");
        }
        if is_blank(&self.s3.region) {
            self.s3.region = lookup("AWS_REGION")
                .or_else(|| lookup("AWS_DEFAULT_REGION"))
                .or_else(|| Some(DEFAULT_REGION.to_string()));
        }
        Ok(())
    }

    pub fn validate(self) -> Result<Config> {
        let bucket = self
            .s3
            .bucket
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| Error::Config("S3 bucket name is required".to_string()))?;

        let format: OutputFormat = self.image.format.parse().map_err(|_| {
            Error::Config(format!(
                "Invalid image format: {}. Must be one of: webp, jpeg, jpg, png",
                self.image.format
            ))
        })?;

        let quality = u8::try_from(self.image.quality)
            .ok()
            .filter(|q| (1..=100).contains(q))
            .ok_or_else(|| {
                Error::Config(format!(
                    "Invalid quality value: {}. Must be an integer between 1 and 100",
                    self.image.quality
                ))
            })?;

        let resize_mode: ResizeMode = self.image.resize_mode.parse().map_err(|_| {
            Error::Config(format!(
                "Invalid resize mode: {}. Must be one of: fit, fill, exact",
                self.image.resize_mode
            ))
        })?;

        Ok(Config {
            storage: StorageConfig {
                bucket,
                endpoint: self.s3.endpoint.filter(|e| !e.trim().is_empty()),
                region: self
                    .s3
                    .region
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                access_key: self.s3.access_key.filter(|k| !k.is_empty()),
                secret_key: self.s3.secret_key.filter(|k| !k.is_empty()),
            },
            image: ImageDefaults {
                format,
                quality,
                resize_mode,
            },
        })
    }
}

/// Partial file contents; every key is optional so absent keys keep defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    s3: RawStorage,
    image: FileImage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileImage {
    format: Option<String>,
    quality: Option<i64>,
    resize_mode: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Candidate config files, highest priority first.
pub fn config_paths(
    cwd: &Path,
    home: Option<&Path>,
    xdg_config_home: Option<&Path>,
) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join("config.toml")];
    if let Some(home) = home {
        paths.push(home.join(".imgre").join("config.toml"));
    }
    match (xdg_config_home, home) {
        (Some(xdg), _) => paths.push(xdg.join("imgre").join("config.toml")),
        (None, Some(home)) => paths.push(home.join(".config").join("imgre").join("config.toml")),
        (None, None) => {}
    }
    paths
}

//! Data models and structures
//!
//! Output formats, resize modes, and the listing records handed back to
//! callers of the object store.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    WebP,
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Lowercase name, also used as the file extension for derived keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Whether `ext` (without the dot, any case) names this format.
    pub fn matches_extension(&self, ext: &str) -> bool {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => *self == Self::Jpeg,
            "png" => *self == Self::Png,
            "webp" => *self == Self::WebP,
            _ => false,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "webp" => Ok(Self::WebP),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Contain within the box, no crop.
    #[default]
    Fit,
    /// Cover the box, then center-crop.
    Fill,
    /// Force the box, aspect ratio may change.
    Exact,
}

impl FromStr for ResizeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fit" => Ok(Self::Fit),
            "fill" => Ok(Self::Fill),
            "exact" => Ok(Self::Exact),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid resize mode: {}. Must be one of: fit, fill, exact",
                s
            ))),
        }
    }
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fit => "fit",
            Self::Fill => "fill",
            Self::Exact => "exact",
        })
    }
}

/// Content type for a file extension, `application/octet-stream` when unknown.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub size_bytes: i64,
    pub last_modified: Option<DateTime<Utc>>,
    pub url: String,
}

impl ObjectEntry {
    pub fn size_formatted(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / (1024.0 * 1024.0))
    }

    /// Key with `prefix` removed, falling back to the full key.
    pub fn display_name(&self, prefix: Option<&str>, delimiter: Option<&str>) -> &str {
        let (Some(prefix), Some(delimiter)) = (prefix, delimiter) else {
            return &self.key;
        };
        let rest = self.key.strip_prefix(prefix).unwrap_or(&self.key);
        match rest.rsplit(delimiter).next() {
            Some(last) if !last.is_empty() => last,
            _ => &self.key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrefixEntry {
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListingPage {
    pub objects: Vec<ObjectEntry>,
    pub prefixes: Vec<PrefixEntry>,
    pub is_truncated: bool,
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, size_bytes: i64) -> ObjectEntry {
        ObjectEntry {
            key: key.to_string(),
            size_bytes,
            last_modified: None,
            url: format!("https://bucket.example.com/{}", key),
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("webp".parse::<OutputFormat>().unwrap(), OutputFormat::WebP);
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);

        let err = "gif".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref f) if f == "gif"));
    }

    #[test]
    fn test_output_format_extension_matching() {
        assert!(OutputFormat::Jpeg.matches_extension("JPG"));
        assert!(OutputFormat::Jpeg.matches_extension("jpeg"));
        assert!(OutputFormat::WebP.matches_extension("WebP"));
        assert!(!OutputFormat::Png.matches_extension("webp"));
        assert!(!OutputFormat::Png.matches_extension(""));
    }

    #[test]
    fn test_resize_mode_parsing() {
        assert_eq!("FILL".parse::<ResizeMode>().unwrap(), ResizeMode::Fill);
        assert_eq!(ResizeMode::default(), ResizeMode::Fit);
        assert!(matches!(
            "stretch".parse::<ResizeMode>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(OutputFormat::WebP.content_type(), "image/webp");
        assert_eq!(content_type_for_extension("JPG"), "image/jpeg");
        assert_eq!(content_type_for_extension("tiff"), "application/octet-stream");
    }

    #[test]
    fn test_size_formatted() {
        assert_eq!(entry("a.png", 1024 * 1024).size_formatted(), "1.00 MB");
        assert_eq!(entry("a.png", 0).size_formatted(), "0.00 MB");
    }

    #[test]
    fn test_display_name_strips_prefix() {
        let obj = entry("photos/2024/cat.webp", 10);
        assert_eq!(obj.display_name(Some("photos/2024/"), Some("/")), "cat.webp");
        assert_eq!(obj.display_name(None, Some("/")), "photos/2024/cat.webp");
        assert_eq!(obj.display_name(Some("photos/"), None), "photos/2024/cat.webp");
    }

    #[test]
    fn test_format_serialization() {
        let json = serde_json::to_string(&OutputFormat::WebP).unwrap();
        assert_eq!(json, "\"webp\"");
        let mode: ResizeMode = serde_json::from_str("\"exact\"").unwrap();
        assert_eq!(mode, ResizeMode::Exact);
    }
}

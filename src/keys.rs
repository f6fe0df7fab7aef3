//! Destination key derivation.
//!
//! Keys are `/`-separated; only the last segment's extension is ever changed.

use crate::models::OutputFormat;
use crate::{Error, Result};

/// Split a key into (everything before the extension, extension).
fn split_extension(key: &str) -> (&str, Option<&str>) {
    let name_start = key.rfind('/').map_or(0, |i| i + 1);
    let name = &key[name_start..];
    match name.rfind('.') {
        // a leading dot is a hidden name, not an extension
        Some(dot) if dot > 0 => {
            let split = name_start + dot;
            (&key[..split], Some(&key[split + 1..]))
        }
        _ => (key, None),
    }
}

/// Replace (or add) the extension so it names `format`.
pub fn with_format_extension(key: &str, format: OutputFormat) -> String {
    let (stem, _) = split_extension(key);
    format!("{}.{}", stem, format.as_str())
}

/// Destination key for an object written in `format`.
///
/// An explicit `target` is kept as-is when its extension already names the
/// format (`jpg` and `jpeg` both name JPEG), otherwise its extension is
/// replaced. Without a target the source key's stem is reused.
pub fn derive_target_key(source: &str, target: Option<&str>, format: OutputFormat) -> String {
    match target {
        Some(target) => match split_extension(target) {
            (_, Some(ext)) if format.matches_extension(ext) => target.to_string(),
            _ => with_format_extension(target, format),
        },
        None => with_format_extension(source, format),
    }
}

/// Fail with [`Error::SameKey`] when a copy would overwrite its source.
pub fn ensure_distinct(source: &str, target: &str) -> Result<()> {
    if source == target {
        return Err(Error::SameKey(source.to_string()));
    }
    Ok(())
}

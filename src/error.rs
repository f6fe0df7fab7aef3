//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported format: {0}. Must be one of: webp, jpeg, png")]
    UnsupportedFormat(String),

    #[error("Target key is the same as source key: {0}")]
    SameKey(String),

    /// Failure reported by the storage or codec collaborator, passed through uninterpreted.
    #[error("{operation} failed for '{target}': {message}")]
    Backend {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("Image processing task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn backend(
        operation: &'static str,
        target: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Error::Backend {
            operation,
            target: target.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_names_operation_and_key() {
        let err = Error::backend("delete_object", "photos/cat.webp", "AccessDenied");
        assert_eq!(
            err.to_string(),
            "delete_object failed for 'photos/cat.webp': AccessDenied"
        );
    }

    #[test]
    fn test_same_key_message() {
        let err = Error::SameKey("photo.png".to_string());
        assert!(err.to_string().contains("photo.png"));
    }
}

//! imgre - image upload and transform tool for S3-compatible object stores
//!
//! Images are uploaded as-is or re-encoded (webp, jpeg, png) with optional
//! resizing, copied between keys with the same transforms, listed one page
//! at a time and deleted in batches.

pub mod app;
pub mod config;
pub mod error;
pub mod image;
pub mod keys;
pub mod listing;
pub mod models;
pub mod storage;

pub use error::{Error, Result};

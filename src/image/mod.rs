//! Image processing and format conversion
//!
//! Decodes source images, applies the resize plan for the requested mode and
//! re-encodes to WebP, JPEG or PNG. The codec sits behind the [`Codec`]
//! trait so the transform pipeline can run against [`MockCodec`] in tests.

pub mod codec;
pub mod geometry;
pub mod mime;
pub mod mock;
pub mod processor;

pub use codec::ImageCodec;
pub use geometry::{resolve, CropRect, ResizePlan, MAX_DIMENSION, MAX_PIXELS};
pub use mime::detect_image_mime;
pub use mock::MockCodec;
pub use processor::{transform, ImageProcessor};

use crate::models::{OutputFormat, ResizeMode};
use crate::{Error, Result};
use ::image::DynamicImage;

/// WebP encoder effort (libwebp `method`, 0..=6).
pub const WEBP_EFFORT: u8 = 6;

/// Decoded raster owned by a single transform call.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    image: DynamicImage,
}

impl ImageBuffer {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// Per-format encoder settings. Only `quality` comes from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub quality: u8,
    pub progressive: bool,
    pub optimize_coding: bool,
    pub max_compression: bool,
    pub effort: u8,
}

impl EncodeParams {
    pub fn for_format(format: OutputFormat, quality: u8) -> Self {
        match format {
            OutputFormat::Jpeg => Self {
                quality,
                progressive: true,
                optimize_coding: true,
                max_compression: false,
                effort: 0,
            },
            // lossless, quality is ignored
            OutputFormat::Png => Self {
                quality,
                progressive: false,
                optimize_coding: false,
                max_compression: true,
                effort: 0,
            },
            OutputFormat::WebP => Self {
                quality,
                progressive: false,
                optimize_coding: false,
                max_compression: false,
                effort: WEBP_EFFORT,
            },
        }
    }
}

/// Decoding and encoding of raster images.
///
/// Implementations must be pure: no filesystem or network access.
pub trait Codec: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<ImageBuffer>;
    fn encode(
        &self,
        image: &ImageBuffer,
        format: OutputFormat,
        params: &EncodeParams,
    ) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: OutputFormat,
    pub quality: u8,
    pub resize_mode: ResizeMode,
}

impl TransformRequest {
    pub fn new(format: OutputFormat, quality: u8) -> Self {
        Self {
            width: None,
            height: None,
            format,
            quality,
            resize_mode: ResizeMode::Fit,
        }
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_resize_mode(mut self, mode: ResizeMode) -> Self {
        self.resize_mode = mode;
        self
    }

    pub fn needs_resize(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    /// Reject per-call values the configuration layer never saw.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(Error::InvalidArgument(format!(
                "Invalid quality value: {}. Must be an integer between 1 and 100",
                self.quality
            )));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(Error::InvalidArgument(
                "width and height must be positive when given".to_string(),
            ));
        }
        for side in [self.width, self.height].into_iter().flatten() {
            if side > MAX_DIMENSION {
                return Err(Error::InvalidArgument(format!(
                    "dimension {} exceeds the maximum of {}",
                    side, MAX_DIMENSION
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub bytes: Vec<u8>,
    pub byte_length: usize,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Decoded (oriented) source size.
    pub source_width: u32,
    pub source_height: u32,
}

impl TransformResult {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_params_are_fixed_per_format() {
        let jpeg = EncodeParams::for_format(OutputFormat::Jpeg, 75);
        assert!(jpeg.progressive && jpeg.optimize_coding);
        assert_eq!(jpeg.quality, 75);

        let png = EncodeParams::for_format(OutputFormat::Png, 10);
        assert!(png.max_compression);

        let webp = EncodeParams::for_format(OutputFormat::WebP, 80);
        assert_eq!(webp.effort, WEBP_EFFORT);
        assert_eq!(webp.quality, 80);
    }

    #[test]
    fn test_request_validation() {
        let request = TransformRequest::new(OutputFormat::WebP, 80);
        assert!(request.validate().is_ok());
        assert!(!request.needs_resize());

        let mut bad = request;
        bad.quality = 0;
        assert!(matches!(bad.validate(), Err(Error::InvalidArgument(_))));

        let mut bad = request;
        bad.quality = 101;
        assert!(bad.validate().is_err());

        let bad = request.with_size(Some(0), Some(10));
        assert!(bad.validate().is_err());

        let ok = request.with_size(None, Some(10));
        assert!(ok.validate().is_ok());
        assert!(ok.needs_resize());

        let huge = request.with_size(Some(u32::MAX), Some(u32::MAX));
        assert!(matches!(huge.validate(), Err(Error::InvalidArgument(_))));
        assert!(request
            .with_size(Some(MAX_DIMENSION), None)
            .validate()
            .is_ok());
    }
}

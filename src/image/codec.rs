use super::{Codec, EncodeParams, ImageBuffer};
use crate::models::OutputFormat;
use crate::{Error, Result};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

/// oxipng preset used when `max_compression` is set.
const PNG_MAX_PRESET: u8 = 6;
const PNG_DEFAULT_PRESET: u8 = 2;

/// Codec backed by the `image` crate for decoding, `jpeg-encoder` for
/// progressive JPEG, oxipng for interlaced PNG and libwebp for lossy WebP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode_jpeg(image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>> {
        let rgb = image.to_rgb8();
        let (width, height) = match (u16::try_from(rgb.width()), u16::try_from(rgb.height())) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "{}x{} exceeds the JPEG limit of 65535 pixels per side",
                    rgb.width(),
                    rgb.height()
                )))
            }
        };

        let mut out = Vec::new();
        let mut encoder = jpeg_encoder::Encoder::new(&mut out, params.quality);
        encoder.set_progressive(params.progressive);
        encoder.set_optimized_huffman_tables(params.optimize_coding);
        encoder
            .encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
            .map_err(|e| Error::backend("encode", "jpeg", e))?;
        Ok(out)
    }

    /// Deflate with `image`, then let oxipng re-filter, strip ancillary
    /// metadata and rewrite the scanlines as Adam7.
    fn encode_png(image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Fast, PngFilter::Adaptive);
        image
            .write_with_encoder(encoder)
            .map_err(|e| Error::backend("encode", "png", e))?;

        let mut options = oxipng::Options::from_preset(if params.max_compression {
            PNG_MAX_PRESET
        } else {
            PNG_DEFAULT_PRESET
        });
        options.interlace = Some(oxipng::Interlacing::Adam7);
        options.strip = oxipng::StripChunks::Safe;
        // keep the Adam7 rewrite even when it does not shrink the file
        options.force = true;

        oxipng::optimize_from_memory(&out, &options)
            .map_err(|e| Error::backend("encode", "png", e))
    }

    fn encode_webp(image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>> {
        let rgba = image.to_rgba8();
        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());

        let mut config = webp::WebPConfig::new()
            .map_err(|_| Error::backend("encode", "webp", "could not initialise encoder config"))?;
        config.lossless = 0;
        config.quality = f32::from(params.quality);
        config.method = i32::from(params.effort);

        let encoded = encoder
            .encode_advanced(&config)
            .map_err(|e| Error::backend("encode", "webp", format!("{:?}", e)))?;
        Ok(encoded.to_vec())
    }
}

impl Codec for ImageCodec {
    /// Decode and apply any EXIF orientation, so the buffer is upright and
    /// no metadata survives into the encoded output.
    fn decode(&self, data: &[u8]) -> Result<ImageBuffer> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| Error::Decode(e.to_string()))?;
        if reader.format().is_none() {
            return Err(Error::Decode("unrecognized image format".to_string()));
        }

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| Error::Decode(e.to_string()))?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut image =
            DynamicImage::from_decoder(decoder).map_err(|e| Error::Decode(e.to_string()))?;
        image.apply_orientation(orientation);

        Ok(ImageBuffer::new(image))
    }

    fn encode(
        &self,
        image: &ImageBuffer,
        format: OutputFormat,
        params: &EncodeParams,
    ) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Jpeg => Self::encode_jpeg(image.as_image(), params),
            OutputFormat::Png => Self::encode_png(image.as_image(), params),
            OutputFormat::WebP => Self::encode_webp(image.as_image(), params),
        }
    }
}

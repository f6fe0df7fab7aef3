use super::geometry::{resolve, ResizePlan};
use super::{Codec, EncodeParams, ImageBuffer, TransformRequest, TransformResult};
use crate::{Error, Result};
use image::imageops::FilterType;
use std::sync::Arc;
use tracing::{debug, info};

/// Resampling filter used for every resize.
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

fn apply_plan(buffer: ImageBuffer, plan: &ResizePlan) -> ImageBuffer {
    if plan.is_identity(buffer.width(), buffer.height()) {
        return buffer;
    }

    let mut image = buffer.into_image();
    if (image.width(), image.height()) != (plan.scaled_width, plan.scaled_height) {
        image = image.resize_exact(plan.scaled_width, plan.scaled_height, RESIZE_FILTER);
    }
    if let Some(crop) = plan.crop {
        image = image.crop_imm(crop.x, crop.y, crop.width, crop.height);
    }
    ImageBuffer::new(image)
}

/// Decode `source`, resize per `request`, and encode to the requested format.
pub fn transform(
    codec: &dyn Codec,
    source: &[u8],
    request: &TransformRequest,
) -> Result<TransformResult> {
    request.validate()?;

    let mut buffer = codec.decode(source)?;
    let (source_width, source_height) = (buffer.width(), buffer.height());
    info!(
        "Original image: {}x{}, {} bytes",
        source_width,
        source_height,
        source.len()
    );

    if request.needs_resize() {
        let plan = resolve(
            buffer.width(),
            buffer.height(),
            request.width,
            request.height,
            request.resize_mode,
        )?;
        debug!(
            "Resize plan ({}): scale to {}x{}, crop {:?}",
            request.resize_mode, plan.scaled_width, plan.scaled_height, plan.crop
        );
        buffer = apply_plan(buffer, &plan);
    }

    let params = EncodeParams::for_format(request.format, request.quality);
    let bytes = codec.encode(&buffer, request.format, &params)?;

    Ok(TransformResult {
        byte_length: bytes.len(),
        bytes,
        format: request.format,
        width: buffer.width(),
        height: buffer.height(),
        source_width,
        source_height,
    })
}

/// Runs [`transform`] off the async runtime.
#[derive(Clone)]
pub struct ImageProcessor {
    codec: Arc<dyn Codec>,
}

impl ImageProcessor {
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self { codec }
    }

    pub async fn process(
        &self,
        source: Arc<Vec<u8>>,
        request: TransformRequest,
    ) -> Result<TransformResult> {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || transform(codec.as_ref(), &source, &request))
            .await
            .map_err(Error::from)?
    }
}

use super::{Codec, EncodeParams, ImageBuffer};
use crate::models::OutputFormat;
use crate::{Error, Result};
use image::DynamicImage;
use std::sync::{Arc, Mutex};

/// One recorded `encode` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCall {
    pub format: OutputFormat,
    pub params: EncodeParams,
    pub width: u32,
    pub height: u32,
}

/// Codec that fabricates blank buffers and records encode calls.
#[derive(Clone)]
pub struct MockCodec {
    width: u32,
    height: u32,
    should_fail_decode: Arc<Mutex<bool>>,
    decode_count: Arc<Mutex<usize>>,
    encode_calls: Arc<Mutex<Vec<EncodeCall>>>,
}

impl MockCodec {
    pub fn new() -> Self {
        Self {
            width: 100,
            height: 100,
            should_fail_decode: Arc::new(Mutex::new(false)),
            decode_count: Arc::new(Mutex::new(0)),
            encode_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Dimensions every decoded buffer will have.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_decode_failure(self, should_fail: bool) -> Self {
        *self.should_fail_decode.lock().unwrap() = should_fail;
        self
    }

    pub fn get_decode_count(&self) -> usize {
        *self.decode_count.lock().unwrap()
    }

    pub fn get_encode_calls(&self) -> Vec<EncodeCall> {
        self.encode_calls.lock().unwrap().clone()
    }
}

impl Default for MockCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for MockCodec {
    fn decode(&self, _data: &[u8]) -> Result<ImageBuffer> {
        if *self.should_fail_decode.lock().unwrap() {
            return Err(Error::Decode("Mock decode failure".to_string()));
        }

        *self.decode_count.lock().unwrap() += 1;
        Ok(ImageBuffer::new(DynamicImage::new_rgb8(
            self.width,
            self.height,
        )))
    }

    fn encode(
        &self,
        image: &ImageBuffer,
        format: OutputFormat,
        params: &EncodeParams,
    ) -> Result<Vec<u8>> {
        self.encode_calls.lock().unwrap().push(EncodeCall {
            format,
            params: *params,
            width: image.width(),
            height: image.height(),
        });
        Ok(format!(
            "{}:{}x{}:q{}",
            format,
            image.width(),
            image.height(),
            params.quality
        )
        .into_bytes())
    }
}

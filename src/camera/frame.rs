use std::path::PathBuf;

use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::CameraResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const FALLBACK: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A frame as handed over by a stream. File-backed frames are decoded
/// later, off the async runtime.
#[derive(Debug, Clone)]
pub enum CapturedFrame {
    Image(DynamicImage),
    File(PathBuf),
}

impl CapturedFrame {
    /// Blocking for `File` frames.
    pub fn decode(self) -> CameraResult<DynamicImage> {
        match self {
            CapturedFrame::Image(image) => Ok(image),
            CapturedFrame::File(path) => Ok(image::open(path)?),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub size: FrameSize,
    pub jpeg: Vec<u8>,
}

/// Draws `image` onto a canvas of `size` and encodes it as JPEG.
/// `quality` is 1..=100.
pub fn encode_frame(image: &DynamicImage, size: FrameSize, quality: u8) -> Result<EncodedFrame> {
    let mut rgb = image.to_rgb8();
    if rgb.dimensions() != (size.width, size.height) {
        rgb = imageops::resize(&rgb, size.width, size.height, FilterType::Triangle);
    }

    let mut jpeg = Vec::with_capacity((size.width * size.height / 8) as usize);
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    encoder.encode_image(&rgb)?;

    Ok(EncodedFrame { size, jpeg })
}

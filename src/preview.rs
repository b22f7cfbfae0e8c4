//! # preview
//!
//! Human-readable previews of image streams. Never read back.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{Delay, DynamicImage, Frame};
use log::debug;
use ndarray::{ArrayView4, Axis};

use crate::constants::{PREVIEW_FPS, PREVIEW_MAX_WIDTH};
use crate::error::{DatasetError, Result};
use crate::share::ndarray_to_rgb_image;

/// Stream of original color images.
pub const ORIGINAL_STREAM: &str = "original";
/// Stream of cropped segmented images.
pub const SEGMENTED_STREAM: &str = "segmented";

/// Receives image streams `[N, H, W, 3]` produced by a build.
pub trait PreviewSink {
    /// Record `frames` under `stream`.
    fn write_stream(&mut self, stream: &str, frames: ArrayView4<'_, u8>) -> Result<()>;
}

/// Discards every stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPreview;

impl PreviewSink for NoPreview {
    fn write_stream(&mut self, _stream: &str, _frames: ArrayView4<'_, u8>) -> Result<()> {
        Ok(())
    }
}

/// Writes each stream as `<dir>/<stream>.gif`, looping at a fixed frame rate.
#[derive(Clone, Debug)]
pub struct GifPreview {
    dir: PathBuf,
    fps: u32,
    max_width: u32,
}

impl GifPreview {
    /// Preview writer into `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fps: PREVIEW_FPS,
            max_width: PREVIEW_MAX_WIDTH,
        }
    }

    /// Downsample frames wider than `max_width`.
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width.max(1);
        self
    }

    /// Path of `stream`'s preview.
    pub fn stream_path(&self, stream: &str) -> PathBuf {
        self.dir.join(format!("{stream}.gif"))
    }
}

impl PreviewSink for GifPreview {
    fn write_stream(&mut self, stream: &str, frames: ArrayView4<'_, u8>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.stream_path(stream);
        let mut encoder = GifEncoder::new(BufWriter::new(File::create(&path)?));
        encoder.set_repeat(Repeat::Infinite)?;

        let delay = Delay::from_numer_denom_ms(1000, self.fps);
        for (idx, frame) in frames.axis_iter(Axis(0)).enumerate() {
            let image = ndarray_to_rgb_image(&frame).ok_or_else(|| DatasetError::ResolutionMismatch {
                frame: idx,
                what: "preview frame",
                expected: vec![frame.shape()[0], frame.shape()[1], 3],
                found: frame.shape().to_vec(),
            })?;
            let (width, height) = image.dimensions();
            let image = match width > self.max_width {
                true => {
                    let scaled_height = (height * self.max_width / width).max(1);
                    imageops::resize(&image, self.max_width, scaled_height, FilterType::Triangle)
                }
                false => image,
            };
            let rgba = DynamicImage::ImageRgb8(image).into_rgba8();
            encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
        }
        debug!("Wrote {} preview frames to {path:?}.", frames.len_of(Axis(0)));
        Ok(())
    }
}

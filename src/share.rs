//! # share
//!
//! Conversion methods between different libraries.

use image::RgbImage;
use ndarray::{Array3, ArrayView3};

use crate::error::Result;

/// Convert an RGB image buffer into an `[H, W, 3]` array.
pub fn rgb_image_to_ndarray(image: RgbImage) -> Result<Array3<u8>> {
    let (width, height) = image.dimensions();
    let frame = Array3::from_shape_vec((height as usize, width as usize, 3), image.into_raw())?;
    Ok(frame)
}

/// Convert an `[H, W, 3]` array into an RGB image buffer.
/// Returns `None` if the last axis does not hold three channels.
pub fn ndarray_to_rgb_image(frame: &ArrayView3<u8>) -> Option<RgbImage> {
    let (height, width, channels) = frame.dim();
    if channels != 3 {
        return None;
    }
    let raw = frame.as_standard_layout().into_owned().into_raw_vec();
    RgbImage::from_raw(width as u32, height as u32, raw)
}

//! # crop
//!
//! Masks and crops a frame to its region of interest and back-projects the cropped
//! depth into a dense point map. Pure, so frames can be cropped on any worker.

use ndarray::{s, Array2, Array3};
use thiserror::Error;

use crate::geometry::camera::pinhole_camera::Intrinsics;
use crate::structures::roi::Roi;

/// Errors raised while cropping a single frame.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CropError {
    /// The region of interest does not fit inside the frame.
    #[error("roi {roi:?} exceeds the {height}x{width} frame")]
    RoiOutOfBounds {
        /// Offending region.
        roi: Roi,
        /// Frame height.
        height: usize,
        /// Frame width.
        width: usize,
    },
    /// Per-frame inputs disagree on their spatial shape.
    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Which input disagreed.
        what: &'static str,
        /// Shape of the color image.
        expected: Vec<usize>,
        /// Observed shape.
        found: Vec<usize>,
    },
}

/// Everything needed to crop one frame. Owned, so it can be moved onto a worker.
#[derive(Clone, Debug)]
pub struct CropInput {
    /// Depth map `[H, W]`, already scaled to meters.
    pub depthmap: Array2<f64>,
    /// Color image `[H, W, 3]`.
    pub image: Array3<u8>,
    /// Foreground mask `[H, W]`.
    pub mask: Array2<bool>,
    /// Region to keep.
    pub roi: Roi,
}

/// Cropped outputs of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CropOutput {
    /// Segmented color image `[H', W', 3]`, background zeroed.
    pub image: Array3<u8>,
    /// Point map `[H', W', 3]`, background and invalid depth at the origin.
    pub pointmap: Array3<f64>,
}

/// Crop one frame.
///
/// Pixels outside `mask` are zeroed in the image and mapped to `(0, 0, 0)` in the
/// point map; so are pixels with non-positive or non-finite depth. Points are
/// expressed in the camera frame using `intrinsics` as recorded for the dataset.
pub fn crop(input: &CropInput, intrinsics: &Intrinsics) -> Result<CropOutput, CropError> {
    let (height, width, _) = input.image.dim();
    if input.depthmap.dim() != (height, width) {
        return Err(CropError::ShapeMismatch {
            what: "depth map",
            expected: vec![height, width],
            found: input.depthmap.shape().to_vec(),
        });
    }
    if input.mask.dim() != (height, width) {
        return Err(CropError::ShapeMismatch {
            what: "mask",
            expected: vec![height, width],
            found: input.mask.shape().to_vec(),
        });
    }
    let roi = input.roi;
    if !roi.fits_within(height, width) {
        return Err(CropError::RoiOutOfBounds { roi, height, width });
    }

    let depth = input.depthmap.slice(s![roi.top..roi.bottom, roi.left..roi.right]);
    let mask = input.mask.slice(s![roi.top..roi.bottom, roi.left..roi.right]);
    let image = input.image.slice(s![roi.top..roi.bottom, roi.left..roi.right, ..]);

    let mut segmented = Array3::<u8>::zeros((roi.height(), roi.width(), 3));
    let mut pointmap = Array3::<f64>::zeros((roi.height(), roi.width(), 3));
    for ((i, j), &is_foreground) in mask.indexed_iter() {
        if !is_foreground {
            continue;
        }
        segmented
            .slice_mut(s![i, j, ..])
            .assign(&image.slice(s![i, j, ..]));

        let z = depth[[i, j]];
        if z > 0. && z.is_finite() {
            let point = intrinsics.back_project(roi.top + i, roi.left + j, z);
            for (axis, value) in point.into_iter().enumerate() {
                pointmap[[i, j, axis]] = value;
            }
        }
    }
    Ok(CropOutput {
        image: segmented,
        pointmap,
    })
}

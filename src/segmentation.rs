//! # segmentation
//!
//! Boundary to the segmentation model: a color image goes in, a foreground mask
//! and a fixed-size region of interest come out.

use ndarray::{Array2, ArrayView3, Axis, Zip};

use crate::error::{DatasetError, Result};
use crate::structures::roi::Roi;

/// Foreground mask and region of interest of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Segmentation {
    /// Foreground mask `[H, W]`.
    pub mask: Array2<bool>,
    /// Region of interest of size `output_resolution`.
    pub roi: Roi,
}

/// A segmentation model.
///
/// Implementations may hold model state that is not thread-safe; the pipeline
/// calls `segment` sequentially, one frame at a time.
pub trait Segmenter {
    /// Fixed `(height, width)` of every region of interest produced.
    fn output_resolution(&self) -> (usize, usize);

    /// Segment one `[H, W, 3]` color image.
    fn segment(&mut self, image: ArrayView3<'_, u8>) -> Result<Segmentation>;
}

/// Segments everything that differs from a uniform background color.
///
/// The region of interest is an `height`×`width` window centered on the bounding
/// box of the foreground and clamped to the frame.
#[derive(Clone, Debug)]
pub struct ForegroundSegmenter {
    /// Output height in pixels.
    pub height: usize,
    /// Output width in pixels.
    pub width: usize,
    /// Background color.
    pub background: [u8; 3],
    /// Largest per-channel difference still considered background.
    pub tolerance: u8,
}

impl ForegroundSegmenter {
    /// Segmenter with a black background and zero tolerance.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            background: [0, 0, 0],
            tolerance: 0,
        }
    }

    fn mask(&self, image: &ArrayView3<'_, u8>) -> Array2<bool> {
        let (height, width, _) = image.dim();
        let mut mask = Array2::<bool>::from_elem((height, width), false);
        Zip::from(&mut mask)
            .and(image.lanes(Axis(2)))
            .for_each(|is_foreground, pixel| {
                *is_foreground = pixel
                    .iter()
                    .zip(self.background)
                    .any(|(&value, background)| value.abs_diff(background) > self.tolerance);
            });
        mask
    }
}

impl Segmenter for ForegroundSegmenter {
    fn output_resolution(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn segment(&mut self, image: ArrayView3<'_, u8>) -> Result<Segmentation> {
        let (height, width, _) = image.dim();
        if height < self.height || width < self.width {
            return Err(DatasetError::ResolutionMismatch {
                frame: 0,
                what: "segmenter input",
                expected: vec![self.height, self.width],
                found: vec![height, width],
            });
        }
        let mask = self.mask(&image);

        let mut rows = (usize::MAX, 0);
        let mut cols = (usize::MAX, 0);
        for ((i, j), _) in mask.indexed_iter().filter(|(_, x)| **x) {
            rows = (rows.0.min(i), rows.1.max(i));
            cols = (cols.0.min(j), cols.1.max(j));
        }
        let (center_row, center_col) = match rows.0 {
            usize::MAX => (height / 2, width / 2),
            _ => ((rows.0 + rows.1) / 2, (cols.0 + cols.1) / 2),
        };

        let top = center_row
            .saturating_sub(self.height / 2)
            .min(height - self.height);
        let left = center_col
            .saturating_sub(self.width / 2)
            .min(width - self.width);
        Ok(Segmentation {
            mask,
            roi: Roi::from_origin(top, left, self.height, self.width),
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::{ForegroundSegmenter, Segmenter};
    use crate::structures::roi::Roi;

    #[test]
    fn test_roi_is_centered_and_clamped() {
        let mut image = Array3::<u8>::zeros((10, 12, 3));
        image[[8, 10, 0]] = 255;
        image[[9, 11, 2]] = 255;

        let mut segmenter = ForegroundSegmenter::new(4, 4);
        let segmentation = segmenter.segment(image.view()).unwrap();
        assert_eq!(segmentation.mask.iter().filter(|&&x| x).count(), 2);
        assert!(segmentation.mask[[9, 11]]);
        assert_eq!(segmentation.roi, Roi::from_origin(6, 8, 4, 4));
    }

    #[test]
    fn test_empty_frame_uses_center() {
        let image = Array3::<u8>::zeros((10, 12, 3));
        let mut segmenter = ForegroundSegmenter::new(4, 6);
        let segmentation = segmenter.segment(image.view()).unwrap();
        assert_eq!(segmentation.roi, Roi::from_origin(3, 3, 4, 6));
    }
}

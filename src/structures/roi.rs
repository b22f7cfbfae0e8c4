use serde::{Deserialize, Serialize};

/// Axis-aligned region of interest in pixel coordinates of the original frame.
/// `bottom` and `right` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    /// First row.
    pub top: usize,
    /// First column.
    pub left: usize,
    /// One past the last row.
    pub bottom: usize,
    /// One past the last column.
    pub right: usize,
}

impl Roi {
    /// Construct a region from its top-left corner and size.
    pub fn from_origin(top: usize, left: usize, height: usize, width: usize) -> Self {
        Self {
            top,
            left,
            bottom: top + height,
            right: left + width,
        }
    }

    /// Number of rows covered.
    pub fn height(&self) -> usize {
        self.bottom.saturating_sub(self.top)
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.right.saturating_sub(self.left)
    }

    /// `true` if the region lies within a `height`×`width` frame.
    pub fn fits_within(&self, height: usize, width: usize) -> bool {
        self.top <= self.bottom && self.left <= self.right && self.bottom <= height && self.right <= width
    }

    /// Row layout stored in containers: `[top, left, bottom, right]`.
    pub fn to_row(&self) -> [i64; 4] {
        [
            self.top as i64,
            self.left as i64,
            self.bottom as i64,
            self.right as i64,
        ]
    }

    /// Inverse of [`Roi::to_row`]. Returns `None` for negative coordinates.
    pub fn from_row(row: &[i64]) -> Option<Self> {
        match row {
            [top, left, bottom, right] => Some(Self {
                top: usize::try_from(*top).ok()?,
                left: usize::try_from(*left).ok()?,
                bottom: usize::try_from(*bottom).ok()?,
                right: usize::try_from(*right).ok()?,
            }),
            _ => None,
        }
    }
}

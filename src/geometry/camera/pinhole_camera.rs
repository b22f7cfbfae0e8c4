use std::fmt;

use ndarray::{Array, Ix2};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches the textual intrinsics recorded by the capture rig, e.g.
/// `[ 640x480  p[318.48 241.17]  f[615.96 616.04]  Inverse Brown Conrady [0 0 0 0 0] ]`.
static INTRINSICS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let number = r"([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)";
    Regex::new(&format!(
        r"(\d+)x(\d+)\s+p\[\s*{number}\s+{number}\s*\]\s+f\[\s*{number}\s+{number}\s*\]"
    ))
    .expect("intrinsics pattern is valid")
});

/// Pinhole camera intrinsics.
#[derive(Clone, Debug, PartialEq)]
pub struct Intrinsics {
    /// Horizontal focal length in pixels.
    pub fx_px: f64,
    /// Vertical focal length in pixels.
    pub fy_px: f64,
    /// Horizontal focal center in pixels.
    pub cx_px: f64,
    /// Vertical focal center in pixels.
    pub cy_px: f64,
    /// Width of image in pixels.
    pub width_px: usize,
    /// Height of image in pixels.
    pub height_px: usize,
}

impl Intrinsics {
    /// Construct a new `Intrinsics` instance.
    pub fn new(
        fx_px: f64,
        fy_px: f64,
        cx_px: f64,
        cy_px: f64,
        width_px: usize,
        height_px: usize,
    ) -> Self {
        Self {
            fx_px,
            fy_px,
            cx_px,
            cy_px,
            width_px,
            height_px,
        }
    }

    /// Parse the identifier string stored alongside every capture.
    /// Returns `None` when the principal point or focal lengths cannot be found.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let captures = INTRINSICS_PATTERN.captures(identifier)?;
        let float = |i: usize| captures.get(i)?.as_str().parse::<f64>().ok();
        let int = |i: usize| captures.get(i)?.as_str().parse::<usize>().ok();
        Some(Self {
            width_px: int(1)?,
            height_px: int(2)?,
            cx_px: float(3)?,
            cy_px: float(4)?,
            fx_px: float(5)?,
            fy_px: float(6)?,
        })
    }

    /// Camera intrinsic matrix.
    pub fn k(&self) -> Array<f64, Ix2> {
        let mut k = Array::<f64, Ix2>::eye(3);
        k[[0, 0]] = self.fx_px;
        k[[1, 1]] = self.fy_px;
        k[[0, 2]] = self.cx_px;
        k[[1, 2]] = self.cy_px;
        k
    }

    /// Back-project the pixel at (`row`, `col`) with depth `z` into camera coordinates.
    #[inline]
    pub fn back_project(&self, row: usize, col: usize, z: f64) -> [f64; 3] {
        let x = (col as f64 - self.cx_px) * z / self.fx_px;
        let y = (row as f64 - self.cy_px) * z / self.fy_px;
        [x, y, z]
    }
}

impl fmt::Display for Intrinsics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ {}x{}  p[{} {}]  f[{} {}] ]",
            self.width_px, self.height_px, self.cx_px, self.cy_px, self.fx_px, self.fy_px
        )
    }
}

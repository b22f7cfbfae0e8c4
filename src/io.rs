//! # io
//!
//! Reading operations for raw capture files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{Array2, Array3};
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use serde::Deserialize;

use crate::error::{DatasetError, Result};
use crate::share::rgb_image_to_ndarray;

/// Per-frame capture record written by the acquisition rig.
#[derive(Clone, Debug, Deserialize)]
pub struct CaptureRecord {
    /// Camera settings; only the first entry is used.
    pub realsense_info: Vec<RealsenseInfo>,
    /// Tracked objects; only the first (the robot) is used.
    pub objects: Vec<CaptureObject>,
}

/// Camera settings active while the frame was captured.
#[derive(Clone, Debug, Deserialize)]
pub struct RealsenseInfo {
    /// Raw depth units to meters.
    pub depth_scale: f64,
    /// Depth stream intrinsics identifier.
    pub intrin_depth: String,
    /// Color stream intrinsics identifier.
    pub intrin_color: String,
}

/// A tracked object.
#[derive(Clone, Debug, Deserialize)]
pub struct CaptureObject {
    /// Joint states, base first.
    pub joints: Vec<JointRecord>,
}

/// State of a single joint.
#[derive(Clone, Debug, Deserialize)]
pub struct JointRecord {
    /// Joint angle in radians.
    pub angle: f64,
    /// Joint position in the robot base frame.
    pub position: [f64; 3],
}

/// Read and parse a capture JSON file.
/// Missing or mistyped fields raise [`DatasetError::MalformedCapture`].
pub fn read_capture_json(path: &Path) -> Result<CaptureRecord> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|err| DatasetError::MalformedCapture {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Read a color image as an `[H, W, 3]` RGB array.
pub fn read_image_rgb8(path: &Path) -> Result<Array3<u8>> {
    let image = image::open(path)?.into_rgb8();
    rgb_image_to_ndarray(image)
}

/// Read a depth map stored as a 2D `.npy` array of `f64`, `f32` or `u16` (raw z16).
/// Values are returned unscaled.
pub fn read_depthmap(path: &Path) -> Result<Array2<f64>> {
    let open = || -> Result<BufReader<File>> { Ok(BufReader::new(File::open(path)?)) };

    match Array2::<f64>::read_npy(open()?) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return Ok(other?),
    }
    match Array2::<f32>::read_npy(open()?) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return Ok(other?.mapv(f64::from)),
    }
    Ok(Array2::<u16>::read_npy(open()?)?.mapv(f64::from))
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};

    use ndarray::array;
    use ndarray_npy::WriteNpyExt;
    use tempfile::TempDir;

    use super::{read_capture_json, read_depthmap};
    use crate::error::DatasetError;

    #[test]
    fn test_read_depthmap_widens_raw_units() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depth.npy");
        let raw = array![[1_u16, 2], [3, 4]];
        raw.write_npy(File::create(&path).unwrap()).unwrap();
        let depth = read_depthmap(&path).unwrap();
        assert_eq!(depth, array![[1., 2.], [3., 4.]]);
    }

    #[test]
    fn test_read_capture_json_missing_joints() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.json");
        fs::write(
            &path,
            r#"{"realsense_info": [{"depth_scale": 0.001, "intrin_depth": "d", "intrin_color": "c"}],
                "objects": [{"joint_angles": []}]}"#,
        )
        .unwrap();
        let err = read_capture_json(&path).unwrap_err();
        assert!(matches!(err, DatasetError::MalformedCapture { .. }));
    }
}

//! # scanner
//!
//! Discovers per-frame capture triples and extracts joint states and camera settings.

use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::{Array2, Array3};

use crate::constants::{DEPTHMAP_EXTENSIONS, IMAGE_EXTENSIONS, JSON_EXTENSIONS, NUM_JOINTS};
use crate::error::{DatasetError, Result};
use crate::io::{read_capture_json, CaptureRecord, JointRecord, RealsenseInfo};
use crate::ops::{uniform_value, Uniformity};
use crate::path::{collect_files, relative_path_string};

/// Camera settings shared by every frame of a capture.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraSettings {
    /// Raw depth units to meters.
    pub depth_scale: f64,
    /// Depth stream intrinsics identifier.
    pub depth_intrinsics: String,
    /// Color stream intrinsics identifier.
    pub color_intrinsics: String,
}

/// Index of a raw capture directory.
///
/// The i-th JSON, depth map and image are assumed to describe the same frame.
/// Correspondence is established by sorted relative path order only.
#[derive(Clone, Debug)]
pub struct CaptureIndex {
    /// Capture root directory.
    pub root: PathBuf,
    /// JSON paths relative to `root`.
    pub jsons: Vec<String>,
    /// Depth map paths relative to `root`.
    pub depthmaps: Vec<String>,
    /// Image paths relative to `root`.
    pub images: Vec<String>,
    /// Joint angles `[N, 6]`.
    pub angles: Array2<f64>,
    /// Joint positions `[N, 6, 3]`.
    pub positions: Array3<f64>,
    /// Uniform camera settings.
    pub camera: CameraSettings,
}

impl CaptureIndex {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.jsons.len()
    }

    /// `true` if the capture holds no frames.
    pub fn is_empty(&self) -> bool {
        self.jsons.is_empty()
    }

    /// Absolute path of the depth map of frame `idx`.
    pub fn depthmap_path(&self, idx: usize) -> PathBuf {
        self.root.join(&self.depthmaps[idx])
    }

    /// Absolute path of the color image of frame `idx`.
    pub fn image_path(&self, idx: usize) -> PathBuf {
        self.root.join(&self.images[idx])
    }
}

/// Scan `root` for capture triples, parse every JSON and check camera uniformity.
pub fn scan(root: &Path) -> Result<CaptureIndex> {
    let json_paths = collect_files(root, &JSON_EXTENSIONS)?;
    let depthmap_paths = collect_files(root, &DEPTHMAP_EXTENSIONS)?;
    let image_paths = collect_files(root, &IMAGE_EXTENSIONS)?;

    let length = json_paths.len();
    if depthmap_paths.len() != length || image_paths.len() != length {
        return Err(DatasetError::InconsistentCapture {
            jsons: json_paths.len(),
            depthmaps: depthmap_paths.len(),
            images: image_paths.len(),
        });
    }
    if length == 0 {
        return Err(DatasetError::EmptyCapture(root.to_path_buf()));
    }
    info!("Found {length} frames in {root:?}.");

    let mut angles = Array2::<f64>::zeros((length, NUM_JOINTS));
    let mut positions = Array3::<f64>::zeros((length, NUM_JOINTS, 3));
    let mut depth_scales = Vec::with_capacity(length);
    let mut depth_intrinsics = Vec::with_capacity(length);
    let mut color_intrinsics = Vec::with_capacity(length);

    for (idx, path) in json_paths.iter().enumerate() {
        let record = read_capture_json(path)?;
        let (info, joints) = first_entries(path, &record)?;
        for (joint_idx, joint) in joints.iter().take(NUM_JOINTS).enumerate() {
            angles[[idx, joint_idx]] = joint.angle;
            for (axis, value) in joint.position.iter().enumerate() {
                positions[[idx, joint_idx, axis]] = *value;
            }
        }
        depth_scales.push(info.depth_scale);
        depth_intrinsics.push(info.intrin_depth.clone());
        color_intrinsics.push(info.intrin_color.clone());
    }
    debug!("Parsed {length} capture records.");

    let camera = CameraSettings {
        depth_scale: require_uniform("depth_scale", depth_scales)?,
        depth_intrinsics: require_uniform("depth_intrinsics", depth_intrinsics)?,
        color_intrinsics: require_uniform("color_intrinsics", color_intrinsics)?,
    };

    let relative = |paths: &[PathBuf]| -> Vec<String> {
        paths
            .iter()
            .map(|x| relative_path_string(root, x))
            .collect()
    };
    Ok(CaptureIndex {
        root: root.to_path_buf(),
        jsons: relative(&json_paths),
        depthmaps: relative(&depthmap_paths),
        images: relative(&image_paths),
        angles,
        positions,
        camera,
    })
}

fn first_entries<'a>(
    path: &Path,
    record: &'a CaptureRecord,
) -> Result<(&'a RealsenseInfo, &'a [JointRecord])> {
    let malformed = |reason: String| DatasetError::MalformedCapture {
        path: path.to_path_buf(),
        reason,
    };
    let info = record
        .realsense_info
        .first()
        .ok_or_else(|| malformed("`realsense_info` is empty".to_string()))?;
    let object = record
        .objects
        .first()
        .ok_or_else(|| malformed("`objects` is empty".to_string()))?;
    if object.joints.len() < NUM_JOINTS {
        return Err(malformed(format!(
            "expected {NUM_JOINTS} joints, found {}",
            object.joints.len()
        )));
    }
    Ok((info, &object.joints))
}

fn require_uniform<T>(field: &'static str, values: Vec<T>) -> Result<T>
where
    T: PartialEq + std::fmt::Debug,
{
    match uniform_value(values) {
        Uniformity::Uniform(value) => Ok(value),
        Uniformity::Inconsistent(values) => Err(DatasetError::InconsistentCamera {
            field,
            values: values.iter().map(|x| format!("{x:?}")).collect(),
        }),
        Uniformity::Empty => Err(DatasetError::InconsistentCamera {
            field,
            values: vec![],
        }),
    }
}

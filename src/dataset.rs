//! # dataset
//!
//! In-memory representation of a dataset: scalar attributes plus frame-indexed arrays.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ndarray::{concatenate, Array2, Array3, Array4, Axis};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ANGLES_KEY, DEPTHMAPS_KEY, DEPTHMAP_PATHS_KEY, IMAGE_PATHS_KEY, JSON_PATHS_KEY,
    ORIGINAL_IMAGES_KEY, POINTMAPS_KEY, POSITIONS_KEY, ROIS_KEY, SEGMENTED_IMAGES_KEY,
};
use crate::error::{DatasetError, Result};
use crate::ops::{check_indices, gather};

/// Container format version, `MAJOR.MINOR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FormatVersion {
    /// Incremented on backwards-incompatible layout changes.
    pub major: u32,
    /// Incremented on compatible changes.
    pub minor: u32,
}

impl FormatVersion {
    /// Versions with the same major number can be read by each other.
    pub fn is_compatible_with(&self, other: &FormatVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for FormatVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').unwrap_or((s, "0"));
        let parse = |x: &str| {
            x.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid format version `{s}`"))
        };
        Ok(Self {
            major: parse(major)?,
            minor: parse(minor)?,
        })
    }
}

impl TryFrom<String> for FormatVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormatVersion> for String {
    fn from(value: FormatVersion) -> Self {
        value.to_string()
    }
}

/// Kind of container: a primary build, or a label for anything derived from one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatasetType {
    /// Built directly from a raw capture.
    Full,
    /// Subset or weld, tagged with its label.
    Derived(String),
}

impl DatasetType {
    /// Tag written for primary builds.
    pub const FULL: &'static str = "full";

    /// String tag as written to the container.
    pub fn as_str(&self) -> &str {
        match self {
            DatasetType::Full => Self::FULL,
            DatasetType::Derived(label) => label,
        }
    }
}

impl From<String> for DatasetType {
    fn from(value: String) -> Self {
        match value.as_str() {
            DatasetType::FULL => DatasetType::Full,
            _ => DatasetType::Derived(value),
        }
    }
}

impl From<DatasetType> for String {
    fn from(value: DatasetType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar attributes stored at the root of every container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerAttributes {
    /// Dataset name.
    pub name: String,
    /// Format version the container was written with.
    pub version: FormatVersion,
    /// Number of frames.
    pub length: usize,
    /// When the frames were first built.
    pub build_date: DateTime<Utc>,
    /// When this container was written.
    pub compile_date: DateTime<Utc>,
    /// Seconds spent producing this container.
    pub compile_time: f64,
    /// `full`, or the label of a derived container.
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    /// Original image shape `[H, W, 3]`.
    pub original_resolution: [usize; 3],
    /// Segmented image shape `[H', W', 3]`.
    pub segmented_resolution: [usize; 3],
    /// Depth stream intrinsics identifier.
    pub depth_intrinsics: String,
    /// Color stream intrinsics identifier.
    pub color_intrinsics: String,
    /// Raw depth units to meters.
    pub depth_scale: f64,
}

impl ContainerAttributes {
    /// Check the attributes that must match for two containers to be welded.
    pub fn check_weld_compatible(&self, other: &ContainerAttributes) -> Result<()> {
        fn differ(attribute: &'static str, left: String, right: String) -> Result<()> {
            match left == right {
                true => Ok(()),
                false => Err(DatasetError::IncompatibleDatasets {
                    attribute,
                    left,
                    right,
                }),
            }
        }
        differ(
            "version",
            self.version.to_string(),
            other.version.to_string(),
        )?;
        differ(
            "original_resolution",
            format!("{:?}", self.original_resolution),
            format!("{:?}", other.original_resolution),
        )?;
        differ(
            "segmented_resolution",
            format!("{:?}", self.segmented_resolution),
            format!("{:?}", other.segmented_resolution),
        )?;
        differ(
            "depth_intrinsics",
            self.depth_intrinsics.clone(),
            other.depth_intrinsics.clone(),
        )?;
        differ(
            "color_intrinsics",
            self.color_intrinsics.clone(),
            other.color_intrinsics.clone(),
        )?;
        if self.depth_scale.to_bits() != other.depth_scale.to_bits() {
            return Err(DatasetError::IncompatibleDatasets {
                attribute: "depth_scale",
                left: format!("{:?}", self.depth_scale),
                right: format!("{:?}", other.depth_scale),
            });
        }
        Ok(())
    }
}

/// Every per-frame array of a dataset, indexed by frame along axis 0.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetArrays {
    /// Joint angles `[N, 6]`.
    pub angles: Array2<f64>,
    /// Joint positions `[N, 6, 3]`.
    pub positions: Array3<f64>,
    /// Scaled depth maps `[N, H, W]`.
    pub depthmaps: Array3<f64>,
    /// Cropped point maps `[N, H', W', 3]`.
    pub pointmaps: Array4<f64>,
    /// Original color images `[N, H, W, 3]`.
    pub original_images: Array4<u8>,
    /// Cropped segmented images `[N, H', W', 3]`.
    pub segmented_images: Array4<u8>,
    /// Regions of interest `[N, 4]` as `[top, left, bottom, right]`.
    pub rois: Array2<i64>,
    /// Source JSON paths relative to the capture root.
    pub json_paths: Vec<String>,
    /// Source depth map paths relative to the capture root.
    pub depthmap_paths: Vec<String>,
    /// Source image paths relative to the capture root.
    pub image_paths: Vec<String>,
}

impl DatasetArrays {
    /// Leading dimension of every array, keyed by container entry.
    pub fn frame_counts(&self) -> [(&'static str, usize); 10] {
        [
            (ANGLES_KEY, self.angles.len_of(Axis(0))),
            (POSITIONS_KEY, self.positions.len_of(Axis(0))),
            (DEPTHMAPS_KEY, self.depthmaps.len_of(Axis(0))),
            (POINTMAPS_KEY, self.pointmaps.len_of(Axis(0))),
            (ORIGINAL_IMAGES_KEY, self.original_images.len_of(Axis(0))),
            (SEGMENTED_IMAGES_KEY, self.segmented_images.len_of(Axis(0))),
            (ROIS_KEY, self.rois.len_of(Axis(0))),
            (JSON_PATHS_KEY, self.json_paths.len()),
            (DEPTHMAP_PATHS_KEY, self.depthmap_paths.len()),
            (IMAGE_PATHS_KEY, self.image_paths.len()),
        ]
    }

    /// Check that every array holds exactly `length` frames.
    pub fn check_length(&self, length: usize) -> Result<()> {
        for (array, found) in self.frame_counts() {
            if found != length {
                return Err(DatasetError::LengthMismatch {
                    array: array.to_string(),
                    expected: length,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Number of frames, taken from the joint angles.
    pub fn len(&self) -> usize {
        self.angles.len_of(Axis(0))
    }

    /// `true` if the dataset holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather the frames at `indices`, in order.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        check_indices(indices, self.len())?;
        Ok(Self {
            angles: self.angles.select(Axis(0), indices),
            positions: self.positions.select(Axis(0), indices),
            depthmaps: self.depthmaps.select(Axis(0), indices),
            pointmaps: self.pointmaps.select(Axis(0), indices),
            original_images: self.original_images.select(Axis(0), indices),
            segmented_images: self.segmented_images.select(Axis(0), indices),
            rois: self.rois.select(Axis(0), indices),
            json_paths: gather(&self.json_paths, indices)?,
            depthmap_paths: gather(&self.depthmap_paths, indices)?,
            image_paths: gather(&self.image_paths, indices)?,
        })
    }

    /// Concatenate `self` followed by `other` along the frame axis.
    pub fn concatenate(&self, other: &Self) -> Result<Self> {
        let chain = |a: &[String], b: &[String]| a.iter().chain(b).cloned().collect::<Vec<_>>();
        Ok(Self {
            angles: concatenate(Axis(0), &[self.angles.view(), other.angles.view()])?,
            positions: concatenate(Axis(0), &[self.positions.view(), other.positions.view()])?,
            depthmaps: concatenate(Axis(0), &[self.depthmaps.view(), other.depthmaps.view()])?,
            pointmaps: concatenate(Axis(0), &[self.pointmaps.view(), other.pointmaps.view()])?,
            original_images: concatenate(
                Axis(0),
                &[self.original_images.view(), other.original_images.view()],
            )?,
            segmented_images: concatenate(
                Axis(0),
                &[self.segmented_images.view(), other.segmented_images.view()],
            )?,
            rois: concatenate(Axis(0), &[self.rois.view(), other.rois.view()])?,
            json_paths: chain(&self.json_paths, &other.json_paths),
            depthmap_paths: chain(&self.depthmap_paths, &other.depthmap_paths),
            image_paths: chain(&self.image_paths, &other.image_paths),
        })
    }
}

/// A dataset held in memory, ready to be written as a container.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    /// Scalar attributes.
    pub attributes: ContainerAttributes,
    /// Frame-indexed arrays.
    pub arrays: DatasetArrays,
}

impl Dataset {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.attributes.length
    }

    /// `true` if the dataset holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the length and resolution invariants between attributes and arrays.
    pub fn validate(&self) -> Result<()> {
        self.arrays.check_length(self.attributes.length)?;
        let checks = [
            (
                ORIGINAL_IMAGES_KEY,
                &self.attributes.original_resolution,
                &self.arrays.original_images.shape()[1..],
            ),
            (
                SEGMENTED_IMAGES_KEY,
                &self.attributes.segmented_resolution,
                &self.arrays.segmented_images.shape()[1..],
            ),
            (
                POINTMAPS_KEY,
                &self.attributes.segmented_resolution,
                &self.arrays.pointmaps.shape()[1..],
            ),
        ];
        for (array, expected, found) in checks {
            if expected.as_slice() != found {
                return Err(DatasetError::ResolutionMismatch {
                    frame: 0,
                    what: array,
                    expected: expected.to_vec(),
                    found: found.to_vec(),
                });
            }
        }
        let depth_shape = &self.arrays.depthmaps.shape()[1..];
        if depth_shape != &self.attributes.original_resolution[..2] {
            return Err(DatasetError::ResolutionMismatch {
                frame: 0,
                what: DEPTHMAPS_KEY,
                expected: self.attributes.original_resolution[..2].to_vec(),
                found: depth_shape.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use ndarray::{Array2, Array3, Array4};

    use super::{ContainerAttributes, Dataset, DatasetArrays, DatasetType, FormatVersion};
    use crate::constants::DATASET_VERSION;
    use crate::error::DatasetError;

    /// `length` frames of 4x6 originals cropped to 2x3, every value tagged by frame.
    pub(crate) fn synthetic_dataset(length: usize) -> Dataset {
        let tag = |i: usize| i as f64;
        let now = Utc::now();
        let intrinsics = "[ 6x4  p[3 2]  f[5 5]  Brown Conrady [0 0 0 0 0] ]".to_string();
        Dataset {
            attributes: ContainerAttributes {
                name: "synthetic".to_string(),
                version: DATASET_VERSION,
                length,
                build_date: now,
                compile_date: now,
                compile_time: 0.,
                dataset_type: DatasetType::Full,
                original_resolution: [4, 6, 3],
                segmented_resolution: [2, 3, 3],
                depth_intrinsics: intrinsics.clone(),
                color_intrinsics: intrinsics,
                depth_scale: 0.001,
            },
            arrays: DatasetArrays {
                angles: Array2::from_shape_fn((length, 6), |(i, j)| tag(i) + j as f64 * 0.1),
                positions: Array3::from_shape_fn((length, 6, 3), |(i, j, _)| tag(i) * 10. + j as f64),
                depthmaps: Array3::from_shape_fn((length, 4, 6), |(i, _, _)| tag(i) + 0.5),
                pointmaps: Array4::from_shape_fn((length, 2, 3, 3), |(i, _, _, k)| tag(i) + k as f64),
                original_images: Array4::from_shape_fn((length, 4, 6, 3), |(i, ..)| i as u8),
                segmented_images: Array4::from_shape_fn((length, 2, 3, 3), |(i, ..)| 100 + i as u8),
                rois: Array2::from_shape_fn((length, 4), |(i, k)| [1, 2, 3, 5][k] + i as i64 % 2),
                json_paths: (0..length).map(|i| format!("{i:03}.json")).collect(),
                depthmap_paths: (0..length).map(|i| format!("{i:03}.npy")).collect(),
                image_paths: (0..length).map(|i| format!("{i:03}.png")).collect(),
            },
        }
    }

    #[test]
    fn test_format_version_parse() {
        let version: FormatVersion = "1.4".parse().unwrap();
        assert_eq!(version, FormatVersion { major: 1, minor: 4 });
        assert_eq!(version.to_string(), "1.4");
        assert_eq!("2".parse::<FormatVersion>().unwrap().minor, 0);
        assert!("v1".parse::<FormatVersion>().is_err());
        assert!(version.is_compatible_with(&FormatVersion { major: 1, minor: 0 }));
        assert!(!version.is_compatible_with(&FormatVersion { major: 2, minor: 4 }));
    }

    #[test]
    fn test_dataset_type_tags() {
        assert_eq!(DatasetType::from("full".to_string()), DatasetType::Full);
        let derived = DatasetType::from("train".to_string());
        assert_eq!(derived, DatasetType::Derived("train".to_string()));
        assert_eq!(String::from(derived), "train");
        let json = serde_json::to_string(&DatasetType::Full).unwrap();
        assert_eq!(json, "\"full\"");
    }

    #[test]
    fn test_select_and_concatenate_keep_lock_step() {
        let dataset = synthetic_dataset(5);
        let selected = dataset.arrays.select(&[2, 0, 4]).unwrap();
        selected.check_length(3).unwrap();
        assert_eq!(selected.angles[[0, 0]], 2.);
        assert_eq!(selected.original_images[[1, 0, 0, 0]], 0);
        assert_eq!(selected.json_paths, vec!["002.json", "000.json", "004.json"]);

        let welded = dataset.arrays.concatenate(&selected).unwrap();
        welded.check_length(8).unwrap();
        assert_eq!(welded.segmented_images[[7, 1, 2, 0]], 104);
        assert_eq!(welded.image_paths[5], "002.png");
    }

    #[test]
    fn test_select_out_of_range() {
        let dataset = synthetic_dataset(2);
        let err = dataset.arrays.select(&[0, 2]).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::IndexOutOfRange {
                index: 2,
                length: 2
            }
        ));
    }

    #[test]
    fn test_validate_checks_resolution() {
        let mut dataset = synthetic_dataset(2);
        dataset.validate().unwrap();
        dataset.attributes.segmented_resolution = [3, 3, 3];
        let err = dataset.validate().unwrap_err();
        assert!(matches!(err, DatasetError::ResolutionMismatch { .. }));
    }

    #[test]
    fn test_weld_compatibility() {
        let left = synthetic_dataset(1).attributes;
        let mut right = left.clone();
        left.check_weld_compatible(&right).unwrap();
        right.original_resolution = [8, 6, 3];
        match left.check_weld_compatible(&right).unwrap_err() {
            DatasetError::IncompatibleDatasets { attribute, .. } => {
                assert_eq!(attribute, "original_resolution")
            }
            err => panic!("unexpected error: {err}"),
        }
    }
}

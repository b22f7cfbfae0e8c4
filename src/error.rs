//! # error
//!
//! Error taxonomy for building and deriving datasets.

use std::io;
use std::path::PathBuf;

use ndarray_npy::{ReadNpyError, WriteNpyError};
use thiserror::Error;

use crate::crop::CropError;
use crate::dataset::FormatVersion;

/// Result alias used across the crate.
pub type Result<T, E = DatasetError> = std::result::Result<T, E>;

/// Errors raised while scanning captures, building, reading or deriving containers.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The raw capture does not hold one JSON, depth map and image per frame.
    #[error("unequal number of capture files: {jsons} jsons, {depthmaps} depth maps, {images} images")]
    InconsistentCapture {
        /// Number of JSON files found.
        jsons: usize,
        /// Number of depth maps found.
        depthmaps: usize,
        /// Number of color images found.
        images: usize,
    },

    /// The raw capture holds no frames at all.
    #[error("no capture frames found under {0:?}")]
    EmptyCapture(PathBuf),

    /// A per-frame capture file is missing expected fields.
    #[error("malformed capture file {path:?}: {reason}")]
    MalformedCapture {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Camera settings differ across frames.
    #[error(
        "camera settings must be uniform over the dataset: `{field}` takes {} distinct values ({})",
        .values.len(),
        .values.join(", ")
    )]
    InconsistentCamera {
        /// Name of the diverging setting.
        field: &'static str,
        /// Every distinct value observed.
        values: Vec<String>,
    },

    /// A frame's image, depth map, mask or ROI disagrees with the dataset's established shape.
    #[error("frame {frame}: {what} has shape {found:?}, expected {expected:?}")]
    ResolutionMismatch {
        /// Frame index.
        frame: usize,
        /// Which per-frame array disagreed.
        what: &'static str,
        /// Established shape.
        expected: Vec<usize>,
        /// Observed shape.
        found: Vec<usize>,
    },

    /// The crop of a single frame failed inside the worker pool.
    #[error("crop worker failed on frame {frame}")]
    WorkerFailure {
        /// Frame index.
        frame: usize,
        /// Underlying crop error.
        #[source]
        source: CropError,
    },

    /// A subset index points past the end of the source.
    #[error("index {index} is out of range for a dataset of {length} frames")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Source length.
        length: usize,
    },

    /// Two containers cannot be welded.
    #[error("`{attribute}` must be equal to weld datasets ({left} != {right})")]
    IncompatibleDatasets {
        /// Attribute that differs.
        attribute: &'static str,
        /// Value in the first container.
        left: String,
        /// Value in the second container.
        right: String,
    },

    /// The container was written by an incompatible format version and must be rebuilt.
    #[error("dataset {path:?} is out of date (version {found}, current version {expected})")]
    StaleFormat {
        /// Container path.
        path: PathBuf,
        /// Version recorded in the container.
        found: FormatVersion,
        /// Version of this library.
        expected: FormatVersion,
    },

    /// Per-frame arrays disagree on the frame count.
    #[error("`{array}` holds {found} frames, expected {expected}")]
    LengthMismatch {
        /// Array key.
        array: String,
        /// Expected frame count.
        expected: usize,
        /// Observed frame count.
        found: usize,
    },

    /// The container is missing entries or has an unexpected layout.
    #[error("malformed container {path:?}: {reason}")]
    MalformedContainer {
        /// Container path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// `full` is reserved for primary builds.
    #[error("`{0}` is reserved for primary builds and cannot label a subset")]
    ReservedLabel(String),

    /// A derived container would overwrite one of its sources.
    #[error("destination {0:?} must differ from the source containers")]
    DestinationConflict(PathBuf),

    /// No compiled dataset or raw capture matches the query.
    #[error("no matching dataset found for `{0}`")]
    DatasetNotFound(String),

    /// Worker pool construction failed.
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Image decoding or encoding error.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Archive error.
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    /// `.npy` decoding error.
    #[error(transparent)]
    ReadNpy(#[from] ReadNpyError),

    /// `.npy` encoding error.
    #[error(transparent)]
    WriteNpy(#[from] WriteNpyError),

    /// Array shape error.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// Invalid file discovery pattern.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl DatasetError {
    /// `true` for the non-fatal "discard and rebuild" signal.
    pub fn is_stale(&self) -> bool {
        matches!(self, DatasetError::StaleFormat { .. })
    }
}

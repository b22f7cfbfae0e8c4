//! # constants
//!
//! Common constants used throughout the library.

use crate::dataset::FormatVersion;

/// Current container format version.
/// Compatible versions share the same major number (e.g. 1.0 and 1.4).
/// Backwards-incompatible layouts bump the major number (e.g. 1.4 to 2.0).
pub const DATASET_VERSION: FormatVersion = FormatVersion { major: 1, minor: 0 };

/// Number of robot joints recorded per frame.
pub const NUM_JOINTS: usize = 6;

/// Frames handed to a single worker pool.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Frames stored per compressed chunk.
pub const DEFAULT_CHUNK_FRAMES: usize = 8;

/// Preview video frame rate.
pub const PREVIEW_FPS: u32 = 15;

/// Maximum preview width in pixels.
pub const PREVIEW_MAX_WIDTH: u32 = 320;

/// Container file extension.
pub const CONTAINER_EXTENSION: &str = "npz";

/// Manifest entry holding scalar attributes and array layouts.
pub const MANIFEST_ENTRY: &str = "attrs.json";

/// Capture JSON extension.
pub const JSON_EXTENSIONS: [&str; 1] = ["json"];
/// Depth map extension.
pub const DEPTHMAP_EXTENSIONS: [&str; 1] = ["npy"];
/// Color image extensions.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Joint angles `[N, 6]`.
pub const ANGLES_KEY: &str = "angles";
/// Joint positions `[N, 6, 3]`.
pub const POSITIONS_KEY: &str = "positions";
/// Scaled depth maps `[N, H, W]`.
pub const DEPTHMAPS_KEY: &str = "coordinates/depthmaps";
/// Cropped point maps `[N, H', W', 3]`.
pub const POINTMAPS_KEY: &str = "coordinates/pointmaps";
/// Original color images `[N, H, W, 3]`.
pub const ORIGINAL_IMAGES_KEY: &str = "images/original";
/// Cropped segmented images `[N, H', W', 3]`.
pub const SEGMENTED_IMAGES_KEY: &str = "images/segmented";
/// Regions of interest `[N, 4]`.
pub const ROIS_KEY: &str = "images/rois";
/// Source JSON paths `[N]`.
pub const JSON_PATHS_KEY: &str = "paths/jsons";
/// Source depth map paths `[N]`.
pub const DEPTHMAP_PATHS_KEY: &str = "paths/depthmaps";
/// Source image paths `[N]`.
pub const IMAGE_PATHS_KEY: &str = "paths/images";

/// Every numeric per-frame array in a container.
pub const ARRAY_KEYS: [&str; 7] = [
    ANGLES_KEY,
    POSITIONS_KEY,
    DEPTHMAPS_KEY,
    POINTMAPS_KEY,
    ORIGINAL_IMAGES_KEY,
    SEGMENTED_IMAGES_KEY,
    ROIS_KEY,
];

/// Every string manifest in a container.
pub const PATH_KEYS: [&str; 3] = [JSON_PATHS_KEY, DEPTHMAP_PATHS_KEY, IMAGE_PATHS_KEY];

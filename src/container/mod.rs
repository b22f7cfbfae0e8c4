//! # container
//!
//! On-disk dataset container.
//!
//! A container is a ZIP archive holding a JSON manifest with the scalar attributes
//! and array layouts, one `.npy` entry per chunk of frames for every numeric array,
//! and one JSON entry per path manifest. Chunks make every array readable frame by
//! frame without materializing the whole dataset.

pub mod derive;
pub mod reader;
pub mod writer;

use std::collections::BTreeMap;

use ndarray_npy::{ReadableElement, WritableElement};
use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::constants::DEFAULT_CHUNK_FRAMES;
use crate::dataset::ContainerAttributes;

pub use derive::{subset, subset_path, weld};
pub use reader::{ArrayHandle, Container};
pub use writer::{write, write_with};

/// `dtype` tag of path manifests.
pub const STRING_DTYPE: &str = "str";

/// Element types that can be stored as a container array.
pub trait Element: ReadableElement + WritableElement + Clone {
    /// `dtype` tag recorded in the manifest.
    const DTYPE: &'static str;
}

impl Element for f64 {
    const DTYPE: &'static str = "f64";
}

impl Element for u8 {
    const DTYPE: &'static str = "u8";
}

impl Element for i64 {
    const DTYPE: &'static str = "i64";
}

/// Layout of one array in the container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayInfo {
    /// Element type tag.
    pub dtype: String,
    /// Full shape, frames first.
    pub shape: Vec<usize>,
    /// Frames per chunk entry.
    pub chunk_frames: usize,
    /// Per-array attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ArrayInfo {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// `true` if the array holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of chunk entries.
    pub fn num_chunks(&self) -> usize {
        self.len().div_ceil(self.chunk_frames.max(1))
    }
}

/// Manifest stored at the root of the archive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Scalar attributes.
    pub attributes: ContainerAttributes,
    /// Array layouts by key.
    pub arrays: BTreeMap<String, ArrayInfo>,
}

/// Encoding options of a container write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Frames per chunk entry.
    pub chunk_frames: usize,
    /// DEFLATE level; `None` uses the library default.
    pub compression_level: Option<i32>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            compression_level: None,
        }
    }
}

impl From<&BuildConfig> for WriteOptions {
    fn from(config: &BuildConfig) -> Self {
        Self {
            chunk_frames: config.chunk_frames,
            compression_level: config.compression_level,
        }
    }
}

/// Archive entry holding chunk `chunk` of array `key`.
pub(crate) fn chunk_entry(key: &str, chunk: usize) -> String {
    format!("{key}/{chunk:06}.npy")
}

/// Archive entry holding path manifest `key`.
pub(crate) fn paths_entry(key: &str) -> String {
    format!("{key}.json")
}

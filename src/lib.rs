//! # robotpose
//!
//! Robot pose dataset library: builds versioned, random-access containers from raw
//! RGB-D captures of a robot arm, and derives subsets and welds from them.

#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod constants;
pub mod container;
pub mod crop;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod io;
pub mod ops;
pub mod path;
pub mod pipeline;
pub mod preview;
pub mod scanner;
pub mod segmentation;
pub mod share;
pub mod structures;

pub use catalog::DatasetCatalog;
pub use config::BuildConfig;
pub use container::{subset, weld, ArrayHandle, Container};
pub use dataset::{ContainerAttributes, Dataset, DatasetArrays, DatasetType, FormatVersion};
pub use error::{DatasetError, Result};
pub use pipeline::DatasetBuilder;
pub use segmentation::{ForegroundSegmenter, Segmenter};

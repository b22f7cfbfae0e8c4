//! # structures
//!
//! Small value types shared across the pipeline.

/// Regions of interest.
pub mod roi;

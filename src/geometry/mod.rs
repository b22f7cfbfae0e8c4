//! # geometry
//!
//! Geometric operations for data processing.

/// Camera models.
pub mod camera;

//! # derive
//!
//! Containers derived from existing ones. Sources are never modified; every
//! operation writes a fresh container.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use log::info;

use super::reader::Container;
use super::writer::write_with;
use crate::constants::CONTAINER_EXTENSION;
use crate::dataset::{Dataset, DatasetType};
use crate::error::{DatasetError, Result};
use crate::path::extract_file_stem;

/// Type tag of welds whose inputs carry different types.
pub const WELDED_TYPE: &str = "welded";

/// Destination of the subset of `source` labelled `label`: `<dir>/<stem>_<label>.npz`.
pub fn subset_path(source: &Path, label: &str) -> Result<PathBuf> {
    let stem = extract_file_stem(source)?;
    let file_name = format!("{stem}_{label}.{CONTAINER_EXTENSION}");
    Ok(source.with_file_name(file_name))
}

/// Write the frames of `source` at `indices`, in order, to a new container at `dest`.
///
/// Scalar attributes are carried over except `length`, `type` (set to `label`) and
/// the timestamps. Duplicate indices are kept as given.
pub fn subset(source: &Container, indices: &[usize], label: &str, dest: &Path) -> Result<PathBuf> {
    if label == DatasetType::FULL {
        return Err(DatasetError::ReservedLabel(label.to_string()));
    }
    if same_file(dest, source.path()) {
        return Err(DatasetError::DestinationConflict(dest.to_path_buf()));
    }
    let start = Instant::now();
    let arrays = source.select(indices)?;

    let mut attributes = source.attributes().clone();
    let now = Utc::now();
    attributes.length = indices.len();
    attributes.dataset_type = DatasetType::Derived(label.to_string());
    attributes.build_date = now;
    attributes.compile_date = now;
    attributes.compile_time = start.elapsed().as_secs_f64();

    let dataset = Dataset { attributes, arrays };
    let path = write_with(dest, &dataset, &source.write_options())?;
    info!(
        "Wrote `{label}` subset of {} frames from {:?} to {path:?}.",
        indices.len(),
        source.path()
    );
    Ok(path)
}

/// Concatenate `first` then `second` into a new container named `name` at `dest`.
///
/// The inputs must agree on format version, resolutions, intrinsics and depth scale.
pub fn weld(first: &Container, second: &Container, name: &str, dest: &Path) -> Result<PathBuf> {
    if same_file(dest, first.path()) || same_file(dest, second.path()) {
        return Err(DatasetError::DestinationConflict(dest.to_path_buf()));
    }
    first.attributes().check_weld_compatible(second.attributes())?;
    let start = Instant::now();

    let arrays = first.load()?.arrays.concatenate(&second.load()?.arrays)?;
    let mut attributes = first.attributes().clone();
    let now = Utc::now();
    attributes.name = name.to_string();
    attributes.length = first.len() + second.len();
    if attributes.dataset_type != second.attributes().dataset_type {
        attributes.dataset_type = DatasetType::Derived(WELDED_TYPE.to_string());
    }
    attributes.build_date = now;
    attributes.compile_date = now;
    attributes.compile_time = start.elapsed().as_secs_f64();

    let dataset = Dataset { attributes, arrays };
    let path = write_with(dest, &dataset, &first.write_options())?;
    info!(
        "Welded {:?} ({} frames) and {:?} ({} frames) into {path:?}.",
        first.path(),
        first.len(),
        second.path(),
        second.len()
    );
    Ok(path)
}

fn same_file(left: &Path, right: &Path) -> bool {
    if left == right {
        return true;
    }
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

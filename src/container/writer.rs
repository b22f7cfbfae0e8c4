//! # writer
//!
//! Atomic container writes.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::{ArrayBase, Axis, Data, Dimension, RemoveAxis, Slice};
use ndarray_npy::WriteNpyExt;
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{chunk_entry, paths_entry, ArrayInfo, Element, Manifest, WriteOptions, STRING_DTYPE};
use crate::constants::{
    ANGLES_KEY, DEPTHMAPS_KEY, DEPTHMAP_PATHS_KEY, IMAGE_PATHS_KEY, JSON_PATHS_KEY,
    MANIFEST_ENTRY, ORIGINAL_IMAGES_KEY, POINTMAPS_KEY, POSITIONS_KEY, ROIS_KEY,
    SEGMENTED_IMAGES_KEY,
};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::ops::batch_ranges;

/// Write `dataset` to `dest` with default options.
pub fn write(dest: &Path, dataset: &Dataset) -> Result<PathBuf> {
    write_with(dest, dataset, &WriteOptions::default())
}

/// Write `dataset` to `dest`.
///
/// The archive is assembled in a temporary file next to `dest` and renamed over it
/// once complete, so `dest` either holds a full container or is left untouched.
pub fn write_with(dest: &Path, dataset: &Dataset, options: &WriteOptions) -> Result<PathBuf> {
    dataset.validate()?;

    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    let mut tmp = NamedTempFile::new_in(&parent)?;
    {
        let mut archive = ArchiveWriter::new(BufWriter::new(tmp.as_file_mut()), options);
        archive.write_dataset(dataset)?;
        archive.finish()?.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|err| err.error)?;

    debug!(
        "Wrote {} frames to {dest:?} in chunks of {}.",
        dataset.len(),
        options.chunk_frames
    );
    Ok(dest.to_path_buf())
}

struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    file_options: FileOptions,
    chunk_frames: usize,
    arrays: BTreeMap<String, ArrayInfo>,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    fn new(writer: W, options: &WriteOptions) -> Self {
        let file_options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(options.compression_level);
        Self {
            zip: ZipWriter::new(writer),
            file_options,
            chunk_frames: options.chunk_frames.max(1),
            arrays: BTreeMap::new(),
        }
    }

    fn write_dataset(&mut self, dataset: &Dataset) -> Result<()> {
        let arrays = &dataset.arrays;
        self.write_array(ANGLES_KEY, &arrays.angles)?;
        self.write_array(POSITIONS_KEY, &arrays.positions)?;
        self.write_array(DEPTHMAPS_KEY, &arrays.depthmaps)?;
        self.write_array(POINTMAPS_KEY, &arrays.pointmaps)?;
        self.write_array(ORIGINAL_IMAGES_KEY, &arrays.original_images)?;
        self.write_array(SEGMENTED_IMAGES_KEY, &arrays.segmented_images)?;
        self.write_array(ROIS_KEY, &arrays.rois)?;
        self.write_paths(JSON_PATHS_KEY, &arrays.json_paths)?;
        self.write_paths(DEPTHMAP_PATHS_KEY, &arrays.depthmap_paths)?;
        self.write_paths(IMAGE_PATHS_KEY, &arrays.image_paths)?;

        if let Some(info) = self.arrays.get_mut(DEPTHMAPS_KEY) {
            info.attributes.insert(
                "depth_scale".to_string(),
                serde_json::json!(dataset.attributes.depth_scale),
            );
        }
        let manifest = Manifest {
            attributes: dataset.attributes.clone(),
            arrays: std::mem::take(&mut self.arrays),
        };
        self.zip.start_file(MANIFEST_ENTRY, self.file_options)?;
        serde_json::to_writer_pretty(&mut self.zip, &manifest)?;
        Ok(())
    }

    fn write_array<A, S, D>(&mut self, key: &str, array: &ArrayBase<S, D>) -> Result<()>
    where
        A: Element,
        S: Data<Elem = A>,
        D: Dimension + RemoveAxis,
    {
        let length = array.len_of(Axis(0));
        for (chunk, range) in batch_ranges(length, self.chunk_frames).enumerate() {
            self.zip
                .start_file(chunk_entry(key, chunk), self.file_options)?;
            array
                .slice_axis(Axis(0), Slice::from(range))
                .write_npy(&mut self.zip)?;
        }
        self.arrays.insert(
            key.to_string(),
            ArrayInfo {
                dtype: A::DTYPE.to_string(),
                shape: array.shape().to_vec(),
                chunk_frames: self.chunk_frames,
                attributes: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn write_paths(&mut self, key: &str, paths: &[String]) -> Result<()> {
        self.zip.start_file(paths_entry(key), self.file_options)?;
        serde_json::to_writer(&mut self.zip, paths)?;
        self.arrays.insert(
            key.to_string(),
            ArrayInfo {
                dtype: STRING_DTYPE.to_string(),
                shape: vec![paths.len()],
                chunk_frames: paths.len().max(1),
                attributes: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn finish(mut self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

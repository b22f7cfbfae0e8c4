//! # reader
//!
//! Lazy, read-only access to a container.
//!
//! [`Container::open`] only parses the manifest. Arrays are exposed through
//! [`ArrayHandle`]s which decode the chunks they need on demand, so callers can
//! index, slice or gather frames without knowing whether data is memory-resident.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use ndarray::{concatenate, Array, Axis, Dimension, IxDyn, RemoveAxis, Slice};
use ndarray_npy::ReadNpyExt;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{chunk_entry, paths_entry, ArrayInfo, Element, Manifest, WriteOptions, STRING_DTYPE};
use crate::constants::{
    ANGLES_KEY, ARRAY_KEYS, DATASET_VERSION, DEPTHMAPS_KEY, DEPTHMAP_PATHS_KEY, IMAGE_PATHS_KEY,
    JSON_PATHS_KEY, MANIFEST_ENTRY, ORIGINAL_IMAGES_KEY, PATH_KEYS, POINTMAPS_KEY, POSITIONS_KEY,
    ROIS_KEY, SEGMENTED_IMAGES_KEY,
};
use crate::dataset::{ContainerAttributes, Dataset, DatasetArrays};
use crate::error::{DatasetError, Result};
use crate::ops::check_indices;

/// An open container.
pub struct Container {
    path: PathBuf,
    manifest: Manifest,
    archive: RefCell<ZipArchive<BufReader<File>>>,
}

impl Container {
    /// Open the container at `path`.
    ///
    /// Fails with [`DatasetError::StaleFormat`] when the container was written by an
    /// incompatible format version, and with [`DatasetError::MalformedContainer`] or
    /// [`DatasetError::LengthMismatch`] when its layout is inconsistent.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let manifest: Manifest = {
            let entry = archive
                .by_name(MANIFEST_ENTRY)
                .map_err(|err| entry_error(path, MANIFEST_ENTRY, err))?;
            serde_json::from_reader(entry).map_err(|err| DatasetError::MalformedContainer {
                path: path.to_path_buf(),
                reason: format!("unreadable manifest: {err}"),
            })?
        };

        let version = manifest.attributes.version;
        if !version.is_compatible_with(&DATASET_VERSION) {
            return Err(DatasetError::StaleFormat {
                path: path.to_path_buf(),
                found: version,
                expected: DATASET_VERSION,
            });
        }

        let length = manifest.attributes.length;
        for key in ARRAY_KEYS.iter().chain(PATH_KEYS.iter()) {
            let info = manifest
                .arrays
                .get(*key)
                .ok_or_else(|| DatasetError::MalformedContainer {
                    path: path.to_path_buf(),
                    reason: format!("missing array `{key}`"),
                })?;
            if info.len() != length {
                return Err(DatasetError::LengthMismatch {
                    array: key.to_string(),
                    expected: length,
                    found: info.len(),
                });
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            manifest,
            archive: RefCell::new(archive),
        })
    }

    /// Path the container was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scalar attributes.
    pub fn attributes(&self) -> &ContainerAttributes {
        &self.manifest.attributes
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.manifest.attributes.length
    }

    /// `true` if the container holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Layout of array `key`.
    pub fn array_info(&self, key: &str) -> Option<&ArrayInfo> {
        self.manifest.arrays.get(key)
    }

    /// Per-array attributes of `key`.
    pub fn array_attributes(&self, key: &str) -> Option<&BTreeMap<String, serde_json::Value>> {
        self.array_info(key).map(|info| &info.attributes)
    }

    /// Options reproducing this container's chunking.
    pub fn write_options(&self) -> WriteOptions {
        let mut options = WriteOptions::default();
        if let Some(info) = self.array_info(ANGLES_KEY) {
            options.chunk_frames = info.chunk_frames;
        }
        options
    }

    /// Typed handle on numeric array `key`.
    pub fn array<A: Element, D: Dimension>(&self, key: &str) -> Result<ArrayHandle<'_, A, D>> {
        let info = self.array_info(key).ok_or_else(|| self.malformed(format!("missing array `{key}`")))?;
        if info.dtype != A::DTYPE {
            return Err(self.malformed(format!(
                "array `{key}` holds {}, requested {}",
                info.dtype,
                A::DTYPE
            )));
        }
        if D::NDIM.map_or(false, |ndim| ndim != info.shape.len()) {
            return Err(self.malformed(format!(
                "array `{key}` has {} dimensions, requested {:?}",
                info.shape.len(),
                D::NDIM
            )));
        }
        Ok(ArrayHandle {
            container: self,
            key: key.to_string(),
            info,
            _marker: PhantomData,
        })
    }

    /// Joint angles `[N, 6]`.
    pub fn angles(&self) -> Result<ArrayHandle<'_, f64, ndarray::Ix2>> {
        self.array(ANGLES_KEY)
    }

    /// Joint positions `[N, 6, 3]`.
    pub fn positions(&self) -> Result<ArrayHandle<'_, f64, ndarray::Ix3>> {
        self.array(POSITIONS_KEY)
    }

    /// Scaled depth maps `[N, H, W]`.
    pub fn depthmaps(&self) -> Result<ArrayHandle<'_, f64, ndarray::Ix3>> {
        self.array(DEPTHMAPS_KEY)
    }

    /// Cropped point maps `[N, H', W', 3]`.
    pub fn pointmaps(&self) -> Result<ArrayHandle<'_, f64, ndarray::Ix4>> {
        self.array(POINTMAPS_KEY)
    }

    /// Original color images `[N, H, W, 3]`.
    pub fn original_images(&self) -> Result<ArrayHandle<'_, u8, ndarray::Ix4>> {
        self.array(ORIGINAL_IMAGES_KEY)
    }

    /// Cropped segmented images `[N, H', W', 3]`.
    pub fn segmented_images(&self) -> Result<ArrayHandle<'_, u8, ndarray::Ix4>> {
        self.array(SEGMENTED_IMAGES_KEY)
    }

    /// Regions of interest `[N, 4]`.
    pub fn rois(&self) -> Result<ArrayHandle<'_, i64, ndarray::Ix2>> {
        self.array(ROIS_KEY)
    }

    /// Path manifest `key`.
    pub fn paths(&self, key: &str) -> Result<Vec<String>> {
        let info = self.array_info(key).ok_or_else(|| self.malformed(format!("missing paths `{key}`")))?;
        if info.dtype != STRING_DTYPE {
            return Err(self.malformed(format!("`{key}` is not a path manifest")));
        }
        let name = paths_entry(key);
        let paths: Vec<String> = {
            let mut archive = self.archive.borrow_mut();
            let entry = archive
                .by_name(&name)
                .map_err(|err| entry_error(&self.path, &name, err))?;
            serde_json::from_reader(entry)?
        };
        if paths.len() != info.len() {
            return Err(DatasetError::LengthMismatch {
                array: key.to_string(),
                expected: info.len(),
                found: paths.len(),
            });
        }
        Ok(paths)
    }

    /// Source JSON paths.
    pub fn json_paths(&self) -> Result<Vec<String>> {
        self.paths(JSON_PATHS_KEY)
    }

    /// Source depth map paths.
    pub fn depthmap_paths(&self) -> Result<Vec<String>> {
        self.paths(DEPTHMAP_PATHS_KEY)
    }

    /// Source image paths.
    pub fn image_paths(&self) -> Result<Vec<String>> {
        self.paths(IMAGE_PATHS_KEY)
    }

    /// Materialize every array.
    pub fn load(&self) -> Result<Dataset> {
        let arrays = DatasetArrays {
            angles: self.angles()?.read()?,
            positions: self.positions()?.read()?,
            depthmaps: self.depthmaps()?.read()?,
            pointmaps: self.pointmaps()?.read()?,
            original_images: self.original_images()?.read()?,
            segmented_images: self.segmented_images()?.read()?,
            rois: self.rois()?.read()?,
            json_paths: self.json_paths()?,
            depthmap_paths: self.depthmap_paths()?,
            image_paths: self.image_paths()?,
        };
        let dataset = Dataset {
            attributes: self.attributes().clone(),
            arrays,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Gather the frames at `indices` from every array.
    pub fn select(&self, indices: &[usize]) -> Result<DatasetArrays> {
        check_indices(indices, self.len())?;
        let gather = |paths: Vec<String>| -> Vec<String> {
            indices.iter().map(|&i| paths[i].clone()).collect()
        };
        Ok(DatasetArrays {
            angles: self.angles()?.select(indices)?,
            positions: self.positions()?.select(indices)?,
            depthmaps: self.depthmaps()?.select(indices)?,
            pointmaps: self.pointmaps()?.select(indices)?,
            original_images: self.original_images()?.select(indices)?,
            segmented_images: self.segmented_images()?.select(indices)?,
            rois: self.rois()?.select(indices)?,
            json_paths: gather(self.json_paths()?),
            depthmap_paths: gather(self.depthmap_paths()?),
            image_paths: gather(self.image_paths()?),
        })
    }

    fn malformed(&self, reason: String) -> DatasetError {
        DatasetError::MalformedContainer {
            path: self.path.clone(),
            reason,
        }
    }
}

fn entry_error(path: &Path, name: &str, err: ZipError) -> DatasetError {
    match err {
        ZipError::FileNotFound => DatasetError::MalformedContainer {
            path: path.to_path_buf(),
            reason: format!("missing entry `{name}`"),
        },
        err => err.into(),
    }
}

/// Indexable handle on one on-disk array.
pub struct ArrayHandle<'a, A, D> {
    container: &'a Container,
    key: String,
    info: &'a ArrayInfo,
    _marker: PhantomData<(A, D)>,
}

impl<'a, A, D> ArrayHandle<'a, A, D>
where
    A: Element,
    D: Dimension + RemoveAxis,
{
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.info.len()
    }

    /// `true` if the array holds no frames.
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    /// Full shape, frames first.
    pub fn shape(&self) -> &[usize] {
        &self.info.shape
    }

    /// Frames per chunk.
    pub fn chunk_frames(&self) -> usize {
        self.info.chunk_frames.max(1)
    }

    /// Decode chunk `chunk`.
    pub fn read_chunk(&self, chunk: usize) -> Result<Array<A, D>> {
        let name = chunk_entry(&self.key, chunk);
        let array = {
            let mut archive = self.container.archive.borrow_mut();
            let entry = archive
                .by_name(&name)
                .map_err(|err| entry_error(&self.container.path, &name, err))?;
            Array::<A, D>::read_npy(entry)?
        };

        let start = chunk * self.chunk_frames();
        let expected_frames = self.chunk_frames().min(self.len().saturating_sub(start));
        if array.len_of(Axis(0)) != expected_frames || array.shape()[1..] != self.info.shape[1..] {
            return Err(self.container.malformed(format!(
                "chunk `{name}` has shape {:?}, expected {expected_frames} frames of {:?}",
                array.shape(),
                &self.info.shape[1..]
            )));
        }
        Ok(array)
    }

    /// Read the whole array.
    pub fn read(&self) -> Result<Array<A, D>> {
        let chunks = (0..self.info.num_chunks())
            .map(|chunk| self.read_chunk(chunk))
            .collect::<Result<Vec<_>>>()?;
        self.stack(chunks.iter().map(|chunk| chunk.view()).collect())
    }

    /// Read frame `index`.
    pub fn get(&self, index: usize) -> Result<Array<A, D::Smaller>> {
        check_indices(&[index], self.len())?;
        let chunk = self.read_chunk(index / self.chunk_frames())?;
        Ok(chunk.index_axis(Axis(0), index % self.chunk_frames()).to_owned())
    }

    /// Read the frames in `range`.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Result<Array<A, D>> {
        let indices: Vec<usize> = range.collect();
        self.select(&indices)
    }

    /// Gather the frames at `indices`, in order. Each chunk is decoded at most once.
    pub fn select(&self, indices: &[usize]) -> Result<Array<A, D>> {
        check_indices(indices, self.len())?;
        let chunk_frames = self.chunk_frames();
        let mut chunks: HashMap<usize, Array<A, D>> = HashMap::new();
        for &index in indices {
            let chunk = index / chunk_frames;
            if !chunks.contains_key(&chunk) {
                chunks.insert(chunk, self.read_chunk(chunk)?);
            }
        }
        let views = indices
            .iter()
            .filter_map(|&index| {
                let offset = index % chunk_frames;
                chunks
                    .get(&(index / chunk_frames))
                    .map(|chunk| chunk.slice_axis(Axis(0), Slice::from(offset..offset + 1)))
            })
            .collect();
        self.stack(views)
    }

    fn stack(&self, views: Vec<ndarray::ArrayView<'_, A, D>>) -> Result<Array<A, D>> {
        if views.is_empty() {
            let mut shape = self.info.shape.clone();
            shape[0] = 0;
            let empty = Array::<A, IxDyn>::from_shape_vec(IxDyn(&shape), Vec::new())?;
            return Ok(empty.into_dimensionality::<D>()?);
        }
        Ok(concatenate(Axis(0), &views)?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    use super::Container;
    use crate::container::{write_with, WriteOptions};
    use crate::dataset::tests::synthetic_dataset;
    use crate::error::DatasetError;

    fn written(length: usize, chunk_frames: usize) -> (TempDir, Container) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("robot.npz");
        let options = WriteOptions {
            chunk_frames,
            compression_level: Some(1),
        };
        write_with(&path, &synthetic_dataset(length), &options).unwrap();
        let container = Container::open(&path).unwrap();
        (dir, container)
    }

    #[test]
    fn test_handle_indexing_across_chunks() {
        let (_dir, container) = written(7, 3);
        let angles = container.angles().unwrap();
        assert_eq!(angles.len(), 7);
        assert_eq!(angles.shape(), &[7, 6]);
        assert_eq!(angles.get(4).unwrap()[0], 4.);

        let selected = angles.select(&[6, 0, 3, 3]).unwrap();
        assert_eq!(selected.column(0).to_vec(), vec![6., 0., 3., 3.]);
        assert_eq!(angles.slice(2..5).unwrap().column(0).to_vec(), vec![2., 3., 4.]);

        let images = container.original_images().unwrap();
        assert_eq!(images.select(&[]).unwrap().shape(), &[0, 4, 6, 3]);
        assert!(matches!(
            images.get(7).unwrap_err(),
            DatasetError::IndexOutOfRange { index: 7, length: 7 }
        ));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("robot.npz");
        let dataset = synthetic_dataset(5);
        write_with(&path, &dataset, &WriteOptions::default()).unwrap();

        let container = Container::open(&path).unwrap();
        assert_eq!(container.attributes(), &dataset.attributes);
        assert_eq!(container.load().unwrap(), dataset);
        let depth_scale = &container.array_attributes("coordinates/depthmaps").unwrap()["depth_scale"];
        assert_eq!(depth_scale.as_f64(), Some(0.001));
    }

    #[test]
    fn test_wrong_dtype_is_rejected() {
        let (_dir, container) = written(2, 8);
        let err = container
            .array::<u8, ndarray::Ix2>("angles")
            .err()
            .unwrap();
        assert!(matches!(err, DatasetError::MalformedContainer { .. }));
    }

    #[test]
    fn test_missing_manifest_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.npz");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("angles/000000.npy", FileOptions::default())
            .unwrap();
        zip.write_all(b"").unwrap();
        zip.finish().unwrap();

        let err = Container::open(&path).err().unwrap();
        assert!(matches!(err, DatasetError::MalformedContainer { .. }));
    }
}

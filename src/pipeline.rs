//! # pipeline
//!
//! Builds a full dataset from a raw capture directory.
//!
//! Frames are scanned, loaded and segmented sequentially. Cropping is fanned out in
//! fixed-size batches, each on a freshly built worker pool, and every result is
//! scattered back to its frame index.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use ndarray::{Array2, Array3, Array4, Axis};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::config::BuildConfig;
use crate::constants::DATASET_VERSION;
use crate::container::{write_with, WriteOptions};
use crate::crop::{crop, CropInput, CropOutput};
use crate::dataset::{ContainerAttributes, Dataset, DatasetArrays, DatasetType};
use crate::error::{DatasetError, Result};
use crate::geometry::camera::pinhole_camera::Intrinsics;
use crate::io::{read_depthmap, read_image_rgb8};
use crate::ops::batch_ranges;
use crate::path::extract_file_stem;
use crate::preview::{PreviewSink, ORIGINAL_STREAM, SEGMENTED_STREAM};
use crate::scanner::{scan, CaptureIndex};
use crate::segmentation::Segmenter;
use crate::structures::roi::Roi;

/// Builds full datasets with a given segmenter.
pub struct DatasetBuilder<S: Segmenter> {
    segmenter: S,
    config: BuildConfig,
    preview: Option<Box<dyn PreviewSink>>,
}

impl<S: Segmenter> DatasetBuilder<S> {
    /// Builder with the default configuration and no previews.
    pub fn new(segmenter: S) -> Self {
        Self {
            segmenter,
            config: BuildConfig::default(),
            preview: None,
        }
    }

    /// Replace the build configuration.
    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    /// Send original and segmented image streams to `sink` after cropping.
    pub fn with_preview(mut self, sink: impl PreviewSink + 'static) -> Self {
        self.preview = Some(Box::new(sink));
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the capture under `raw_dir` into a container at `dest`.
    ///
    /// The dataset is named after the file stem of `dest`. Any failure aborts the
    /// build before anything is written.
    pub fn build(&mut self, raw_dir: &Path, dest: &Path) -> Result<PathBuf> {
        let start = Instant::now();
        let build_date = Utc::now();
        let name = extract_file_stem(dest)?;

        let capture = scan(raw_dir)?;
        let intrinsics = Intrinsics::from_identifier(&capture.camera.color_intrinsics)
            .ok_or_else(|| DatasetError::MalformedCapture {
                path: capture.root.join(&capture.jsons[0]),
                reason: format!(
                    "cannot parse color intrinsics `{}`",
                    capture.camera.color_intrinsics
                ),
            })?;

        let (original_images, depthmaps) = self.load_media(&capture)?;
        let (masks, rois) = self.segment(&original_images)?;
        let (segmented_images, pointmaps) = crop_frames(
            &depthmaps,
            &original_images,
            &masks,
            &rois,
            &intrinsics,
            self.segmenter.output_resolution(),
            &self.config,
        )?;
        drop(masks);

        if let Some(sink) = self.preview.as_mut() {
            for (stream, frames) in [
                (ORIGINAL_STREAM, original_images.view()),
                (SEGMENTED_STREAM, segmented_images.view()),
            ] {
                if let Err(err) = sink.write_stream(stream, frames) {
                    warn!("Skipping `{stream}` preview: {err}");
                }
            }
        }

        let (height, width, _) = original_images.index_axis(Axis(0), 0).dim();
        let (crop_height, crop_width) = self.segmenter.output_resolution();
        let mut roi_rows = Array2::<i64>::zeros((rois.len(), 4));
        for (mut row, roi) in roi_rows.outer_iter_mut().zip(&rois) {
            for (value, coordinate) in row.iter_mut().zip(roi.to_row()) {
                *value = coordinate;
            }
        }

        let camera = capture.camera;
        let dataset = Dataset {
            attributes: ContainerAttributes {
                name,
                version: DATASET_VERSION,
                length: capture.jsons.len(),
                build_date,
                compile_date: Utc::now(),
                compile_time: start.elapsed().as_secs_f64(),
                dataset_type: DatasetType::Full,
                original_resolution: [height, width, 3],
                segmented_resolution: [crop_height, crop_width, 3],
                depth_intrinsics: camera.depth_intrinsics,
                color_intrinsics: camera.color_intrinsics,
                depth_scale: camera.depth_scale,
            },
            arrays: DatasetArrays {
                angles: capture.angles,
                positions: capture.positions,
                depthmaps,
                pointmaps,
                original_images,
                segmented_images,
                rois: roi_rows,
                json_paths: capture.jsons,
                depthmap_paths: capture.depthmaps,
                image_paths: capture.images,
            },
        };
        let path = write_with(dest, &dataset, &WriteOptions::from(&self.config))?;
        info!(
            "Built `{}` ({} frames) in {:.1}s: {path:?}",
            dataset.attributes.name,
            dataset.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(path)
    }

    /// Load every color image and depth map, sized by the first frame.
    /// Depth maps are scaled to meters.
    fn load_media(&self, capture: &CaptureIndex) -> Result<(Array4<u8>, Array3<f64>)> {
        let length = capture.len();
        let first = read_image_rgb8(&capture.image_path(0))?;
        let (height, width, _) = first.dim();
        let mut images = Array4::<u8>::zeros((length, height, width, 3));
        let mut depthmaps = Array3::<f64>::zeros((length, height, width));

        let bar = progress_bar(length, self.config.show_progress);
        for idx in 0..length {
            let image = match idx {
                0 => first.clone(),
                _ => read_image_rgb8(&capture.image_path(idx))?,
            };
            if image.dim() != (height, width, 3) {
                return Err(DatasetError::ResolutionMismatch {
                    frame: idx,
                    what: "color image",
                    expected: vec![height, width, 3],
                    found: image.shape().to_vec(),
                });
            }
            images.index_axis_mut(Axis(0), idx).assign(&image);

            let depthmap = read_depthmap(&capture.depthmap_path(idx))?;
            if depthmap.dim() != (height, width) {
                return Err(DatasetError::ResolutionMismatch {
                    frame: idx,
                    what: "depth map",
                    expected: vec![height, width],
                    found: depthmap.shape().to_vec(),
                });
            }
            depthmaps
                .index_axis_mut(Axis(0), idx)
                .assign(&(depthmap * capture.camera.depth_scale));
            bar.inc(1);
        }
        bar.finish_and_clear();
        debug!("Loaded {length} frames of {height}x{width}.");
        Ok((images, depthmaps))
    }

    /// Segment every frame, one at a time.
    fn segment(&mut self, images: &Array4<u8>) -> Result<(Vec<Array2<bool>>, Vec<Roi>)> {
        let (length, height, width, _) = images.dim();
        let (crop_height, crop_width) = self.segmenter.output_resolution();
        let mut masks = Vec::with_capacity(length);
        let mut rois = Vec::with_capacity(length);

        let bar = progress_bar(length, self.config.show_progress);
        for (idx, image) in images.outer_iter().enumerate() {
            let segmentation = self.segmenter.segment(image).map_err(|err| match err {
                DatasetError::ResolutionMismatch {
                    what,
                    expected,
                    found,
                    ..
                } => DatasetError::ResolutionMismatch {
                    frame: idx,
                    what,
                    expected,
                    found,
                },
                err => err,
            })?;
            if segmentation.mask.dim() != (height, width) {
                return Err(DatasetError::ResolutionMismatch {
                    frame: idx,
                    what: "segmentation mask",
                    expected: vec![height, width],
                    found: segmentation.mask.shape().to_vec(),
                });
            }
            let roi = segmentation.roi;
            if (roi.height(), roi.width()) != (crop_height, crop_width) {
                return Err(DatasetError::ResolutionMismatch {
                    frame: idx,
                    what: "roi",
                    expected: vec![crop_height, crop_width],
                    found: vec![roi.height(), roi.width()],
                });
            }
            masks.push(segmentation.mask);
            rois.push(roi);
            bar.inc(1);
        }
        bar.finish_and_clear();
        Ok((masks, rois))
    }
}

/// Crop every frame on batched worker pools.
///
/// Frames are partitioned into batches of `config.batch_size`; each batch is copied
/// into owned work items and cropped on a pool of `config.workers()` threads that
/// lives for that batch only. Outputs are written back by frame index, so the result
/// does not depend on batch size, worker count or scheduling. The first failing
/// frame aborts the whole run.
pub fn crop_frames(
    depthmaps: &Array3<f64>,
    images: &Array4<u8>,
    masks: &[Array2<bool>],
    rois: &[Roi],
    intrinsics: &Intrinsics,
    output_resolution: (usize, usize),
    config: &BuildConfig,
) -> Result<(Array4<u8>, Array4<f64>)> {
    let length = images.len_of(Axis(0));
    for (what, found) in [
        ("depth maps", depthmaps.len_of(Axis(0))),
        ("masks", masks.len()),
        ("rois", rois.len()),
    ] {
        if found != length {
            return Err(DatasetError::LengthMismatch {
                array: what.to_string(),
                expected: length,
                found,
            });
        }
    }

    let (height, width) = output_resolution;
    let mut segmented = Array4::<u8>::zeros((length, height, width, 3));
    let mut pointmaps = Array4::<f64>::zeros((length, height, width, 3));

    let workers = config.workers();
    info!(
        "Cropping {length} frames in batches of {} with {workers} workers.",
        config.batch_size.max(1)
    );
    let bar = progress_bar(length, config.show_progress);
    for batch in batch_ranges(length, config.batch_size) {
        let inputs: Vec<(usize, CropInput)> = batch
            .clone()
            .map(|idx| {
                let input = CropInput {
                    depthmap: depthmaps.index_axis(Axis(0), idx).to_owned(),
                    image: images.index_axis(Axis(0), idx).to_owned(),
                    mask: masks[idx].clone(),
                    roi: rois[idx],
                };
                (idx, input)
            })
            .collect();

        let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
        let outputs: Vec<(usize, std::result::Result<CropOutput, _>)> = pool.install(|| {
            inputs
                .into_par_iter()
                .map(|(idx, input)| (idx, crop(&input, intrinsics)))
                .collect()
        });
        drop(pool);

        for (idx, output) in outputs {
            let output = output.map_err(|source| DatasetError::WorkerFailure { frame: idx, source })?;
            if output.image.dim() != (height, width, 3) {
                return Err(DatasetError::ResolutionMismatch {
                    frame: idx,
                    what: "segmented image",
                    expected: vec![height, width, 3],
                    found: output.image.shape().to_vec(),
                });
            }
            segmented.index_axis_mut(Axis(0), idx).assign(&output.image);
            pointmaps.index_axis_mut(Axis(0), idx).assign(&output.pointmap);
        }
        bar.inc(batch.len() as u64);
    }
    bar.finish_and_clear();
    Ok((segmented, pointmaps))
}

fn progress_bar(length: usize, visible: bool) -> ProgressBar {
    match visible {
        true => ProgressBar::new(length as u64),
        false => ProgressBar::hidden(),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3, Array4, Axis};

    use super::crop_frames;
    use crate::config::BuildConfig;
    use crate::crop::{crop, CropInput};
    use crate::error::DatasetError;
    use crate::geometry::camera::pinhole_camera::Intrinsics;
    use crate::structures::roi::Roi;

    struct Frames {
        depthmaps: Array3<f64>,
        images: Array4<u8>,
        masks: Vec<Array2<bool>>,
        rois: Vec<Roi>,
    }

    fn frames(length: usize) -> Frames {
        let depthmaps = Array3::from_shape_fn((length, 5, 7), |(i, r, c)| 0.5 + (i + r * c) as f64 * 0.01);
        let images = Array4::from_shape_fn((length, 5, 7, 3), |(i, r, c, k)| (i * 7 + r * 3 + c + k) as u8);
        let masks = (0..length)
            .map(|i| Array2::from_shape_fn((5, 7), |(r, c)| (r + c + i) % 3 != 0))
            .collect();
        let rois = (0..length)
            .map(|i| Roi::from_origin(i % 3, i % 4, 3, 4))
            .collect();
        Frames {
            depthmaps,
            images,
            masks,
            rois,
        }
    }

    #[test]
    fn test_crop_frames_independent_of_batching() {
        let intrinsics = Intrinsics::new(3., 4., 3.5, 2.5, 7, 5);
        let data = frames(11);
        let config = |batch_size, num_workers| BuildConfig {
            batch_size,
            num_workers,
            show_progress: false,
            ..Default::default()
        };

        let run = |config: BuildConfig| {
            crop_frames(
                &data.depthmaps,
                &data.images,
                &data.masks,
                &data.rois,
                &intrinsics,
                (3, 4),
                &config,
            )
            .unwrap()
        };
        let reference = run(config(100, 1));
        for (batch_size, workers) in [(1, 4), (3, 2), (4, 3), (11, 8)] {
            assert_eq!(run(config(batch_size, workers)), reference);
        }

        for idx in 0..11 {
            let input = CropInput {
                depthmap: data.depthmaps.index_axis(Axis(0), idx).to_owned(),
                image: data.images.index_axis(Axis(0), idx).to_owned(),
                mask: data.masks[idx].clone(),
                roi: data.rois[idx],
            };
            let expected = crop(&input, &intrinsics).unwrap();
            assert_eq!(reference.0.index_axis(Axis(0), idx), expected.image);
            assert_eq!(reference.1.index_axis(Axis(0), idx), expected.pointmap);
        }
    }

    #[test]
    fn test_crop_frames_reports_failing_frame() {
        let intrinsics = Intrinsics::new(3., 4., 3.5, 2.5, 7, 5);
        let mut data = frames(6);
        data.rois[4] = Roi::from_origin(4, 0, 3, 4);
        let config = BuildConfig {
            batch_size: 2,
            show_progress: false,
            ..Default::default()
        };
        let err = crop_frames(
            &data.depthmaps,
            &data.images,
            &data.masks,
            &data.rois,
            &intrinsics,
            (3, 4),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::WorkerFailure { frame: 4, .. }));
    }
}

//! Synthetic raw captures for integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::Path;

use image::{Rgb, RgbImage};
use ndarray::Array2;
use ndarray_npy::WriteNpyExt;
use serde_json::json;

use robotpose::config::BuildConfig;
use robotpose::pipeline::DatasetBuilder;
use robotpose::segmentation::ForegroundSegmenter;

pub const HEIGHT: usize = 16;
pub const WIDTH: usize = 20;
pub const CROP: usize = 8;
pub const DEPTH_SCALE: f64 = 0.001;
pub const INTRINSICS: &str = "[ 20x16  p[10 8]  f[20 20]  Inverse Brown Conrady [0 0 0 0 0] ]";

/// Per-frame overrides of a synthetic capture.
#[derive(Clone, Debug)]
pub struct SyntheticFrame {
    pub depth_scale: f64,
    pub height: usize,
    pub width: usize,
}

impl Default for SyntheticFrame {
    fn default() -> Self {
        Self {
            depth_scale: DEPTH_SCALE,
            height: HEIGHT,
            width: WIDTH,
        }
    }
}

/// Write `frames.len()` frames under `root`, split over two sub-directories.
/// Frame `i` shows a 4x5 blob whose position and color depend on `i`.
pub fn write_capture(root: &Path, frames: &[SyntheticFrame]) {
    for (i, frame) in frames.iter().enumerate() {
        let dir = root.join(format!("session_{}", i / 3));
        fs::create_dir_all(&dir).unwrap();
        let stem = format!("{i:04}");

        let joints: Vec<_> = (0..6)
            .map(|j| json!({"angle": i as f64 + j as f64 * 0.01, "position": [i as f64, j as f64, 0.5]}))
            .collect();
        let record = json!({
            "realsense_info": [{
                "depth_scale": frame.depth_scale,
                "intrin_depth": INTRINSICS,
                "intrin_color": INTRINSICS
            }],
            "objects": [{"name": "robot", "joints": joints}]
        });
        fs::write(dir.join(format!("{stem}.json")), record.to_string()).unwrap();

        let (top, left) = (2 + i % 6, 3 + (2 * i) % 10);
        let mut image = RgbImage::new(frame.width as u32, frame.height as u32);
        for row in top..(top + 4).min(frame.height) {
            for col in left..(left + 5).min(frame.width) {
                image.put_pixel(col as u32, row as u32, Rgb([200, 10 * i as u8, 50]));
            }
        }
        image.save(dir.join(format!("{stem}.png"))).unwrap();

        let depth = Array2::<u16>::from_shape_fn((frame.height, frame.width), |(r, c)| {
            (1000 + 10 * i + r + c) as u16
        });
        depth
            .write_npy(File::create(dir.join(format!("{stem}.npy"))).unwrap())
            .unwrap();
    }
}

/// `length` uniform frames.
pub fn uniform_frames(length: usize) -> Vec<SyntheticFrame> {
    vec![SyntheticFrame::default(); length]
}

/// Builder with the reference segmenter and quiet progress.
pub fn builder(batch_size: usize, num_workers: usize) -> DatasetBuilder<ForegroundSegmenter> {
    let config = BuildConfig {
        batch_size,
        num_workers,
        chunk_frames: 2,
        show_progress: false,
        ..Default::default()
    };
    DatasetBuilder::new(ForegroundSegmenter::new(CROP, CROP)).with_config(config)
}

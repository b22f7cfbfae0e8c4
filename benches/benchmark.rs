//! # benchmark
//!
//! Benchmarking suite.

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array2, Array3, Array4};
use once_cell::sync::Lazy;
use robotpose::{
    config::BuildConfig,
    container::{subset, write, Container},
    crop::{crop, CropInput},
    dataset::{ContainerAttributes, Dataset, DatasetArrays, DatasetType},
    geometry::camera::pinhole_camera::Intrinsics,
    pipeline::crop_frames,
    structures::roi::Roi,
};
use tempfile::TempDir;

const HEIGHT: usize = 480;
const WIDTH: usize = 640;
const CROP_SIZE: usize = 320;
const NUM_FRAMES: usize = 32;

static INTRINSICS: Lazy<Intrinsics> =
    Lazy::new(|| Intrinsics::new(615.957, 616.041, 318.482, 241.167, WIDTH, HEIGHT));

fn frame() -> CropInput {
    CropInput {
        depthmap: Array2::from_shape_fn((HEIGHT, WIDTH), |(r, c)| 0.5 + (r + c) as f64 * 1e-3),
        image: Array3::from_shape_fn((HEIGHT, WIDTH, 3), |(r, c, k)| (r + c + k) as u8),
        mask: Array2::from_shape_fn((HEIGHT, WIDTH), |(r, c)| (r / 8 + c / 8) % 2 == 0),
        roi: Roi::from_origin(80, 160, CROP_SIZE, CROP_SIZE),
    }
}

fn crop_benchmark(c: &mut Criterion) {
    let input = frame();
    c.bench_function("crop", |b| b.iter(|| crop(&input, &INTRINSICS)));

    let input = frame();
    let depthmaps = Array3::from_shape_fn((NUM_FRAMES, HEIGHT, WIDTH), |(_, r, c)| {
        input.depthmap[[r, c]]
    });
    let images = Array4::from_shape_fn((NUM_FRAMES, HEIGHT, WIDTH, 3), |(_, r, c, k)| {
        input.image[[r, c, k]]
    });
    let masks = vec![input.mask.clone(); NUM_FRAMES];
    let rois = vec![input.roi; NUM_FRAMES];
    let config = BuildConfig {
        batch_size: 8,
        show_progress: false,
        ..Default::default()
    };
    c.bench_function("crop_frames", |b| {
        b.iter(|| {
            crop_frames(
                &depthmaps,
                &images,
                &masks,
                &rois,
                &INTRINSICS,
                (CROP_SIZE, CROP_SIZE),
                &config,
            )
        })
    });
}

fn subset_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("bench.npz");
    let now = chrono::Utc::now();
    let identifier = INTRINSICS.to_string();
    let (h, w) = (HEIGHT / 4, WIDTH / 4);
    let dataset = Dataset {
        attributes: ContainerAttributes {
            name: "bench".to_string(),
            version: robotpose::constants::DATASET_VERSION,
            length: NUM_FRAMES,
            build_date: now,
            compile_date: now,
            compile_time: 0.,
            dataset_type: DatasetType::Full,
            original_resolution: [h, w, 3],
            segmented_resolution: [h / 2, w / 2, 3],
            depth_intrinsics: identifier.clone(),
            color_intrinsics: identifier,
            depth_scale: 0.001,
        },
        arrays: DatasetArrays {
            angles: Array2::zeros((NUM_FRAMES, 6)),
            positions: Array3::zeros((NUM_FRAMES, 6, 3)),
            depthmaps: Array3::from_elem((NUM_FRAMES, h, w), 1.),
            pointmaps: Array4::from_elem((NUM_FRAMES, h / 2, w / 2, 3), 1.),
            original_images: Array4::from_elem((NUM_FRAMES, h, w, 3), 127),
            segmented_images: Array4::from_elem((NUM_FRAMES, h / 2, w / 2, 3), 127),
            rois: Array2::zeros((NUM_FRAMES, 4)),
            json_paths: (0..NUM_FRAMES).map(|i| format!("{i}.json")).collect(),
            depthmap_paths: (0..NUM_FRAMES).map(|i| format!("{i}.npy")).collect(),
            image_paths: (0..NUM_FRAMES).map(|i| format!("{i}.png")).collect(),
        },
    };
    write(&src, &dataset).unwrap();
    let container = Container::open(&src).unwrap();
    let indices: Vec<usize> = (0..NUM_FRAMES).step_by(3).collect();
    let dest = dir.path().join("bench_subset.npz");
    c.bench_function("subset", |b| {
        b.iter(|| subset(&container, &indices, "subset", &dest))
    });
}

criterion_group!(benches, crop_benchmark, subset_benchmark);
criterion_main!(benches);

mod common;

use std::path::Path;

use tempfile::TempDir;

use common::{builder, uniform_frames, write_capture};
use robotpose::catalog::DatasetCatalog;
use robotpose::container::{subset, subset_path, weld, write, Container};
use robotpose::dataset::{DatasetType, FormatVersion};
use robotpose::error::DatasetError;

fn build(dir: &Path, name: &str, length: usize) -> Container {
    let raw = dir.join("raw").join(name);
    write_capture(&raw, &uniform_frames(length));
    let dest = dir.join(name).join(format!("{name}.npz"));
    builder(100, 0).build(&raw, &dest).unwrap();
    Container::open(&dest).unwrap()
}

#[test]
fn test_round_trip() {
    let dir = TempDir::new().unwrap();
    let source = build(dir.path(), "set1", 3);
    let dataset = source.load().unwrap();

    let copy = dir.path().join("copy.npz");
    write(&copy, &dataset).unwrap();
    let reopened = Container::open(&copy).unwrap();
    assert_eq!(reopened.attributes(), source.attributes());
    assert_eq!(reopened.load().unwrap(), dataset);
}

#[test]
fn test_subset_of_built_dataset() {
    let dir = TempDir::new().unwrap();
    let source = build(dir.path(), "set1", 5);
    let dest = subset_path(source.path(), "train").unwrap();
    subset(&source, &[2, 0, 4], "train", &dest).unwrap();

    let derived = Container::open(&dest).unwrap();
    assert_eq!(derived.len(), 3);
    assert_ne!(derived.attributes().dataset_type, DatasetType::Full);
    assert_eq!(
        derived.attributes().segmented_resolution,
        source.attributes().segmented_resolution
    );

    let angles = source.angles().unwrap();
    let derived_angles = derived.angles().unwrap();
    for (k, &idx) in [2, 0, 4].iter().enumerate() {
        assert_eq!(derived_angles.get(k).unwrap(), angles.get(idx).unwrap());
        assert_eq!(
            derived.pointmaps().unwrap().get(k).unwrap(),
            source.pointmaps().unwrap().get(idx).unwrap()
        );
    }
    assert_eq!(
        derived.image_paths().unwrap(),
        vec!["session_0/0002.png", "session_0/0000.png", "session_1/0004.png"]
    );
}

#[test]
fn test_weld_of_built_datasets() {
    let dir = TempDir::new().unwrap();
    let first = build(dir.path(), "first", 3);
    let second = build(dir.path(), "second", 4);
    let dest = dir.path().join("welded.npz");
    weld(&first, &second, "welded", &dest).unwrap();

    let welded = Container::open(&dest).unwrap();
    assert_eq!(welded.len(), 7);
    let images = welded.segmented_images().unwrap();
    for i in 0..7 {
        let expected = match i < 3 {
            true => first.segmented_images().unwrap().get(i).unwrap(),
            false => second.segmented_images().unwrap().get(i - 3).unwrap(),
        };
        assert_eq!(images.get(i).unwrap(), expected);
    }
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 4);
}

#[test]
fn test_weld_rejects_different_resolution() {
    let dir = TempDir::new().unwrap();
    let first = build(dir.path(), "first", 3);
    let second = build(dir.path(), "second", 4);

    let mut dataset = second.load().unwrap();
    dataset.attributes.original_resolution = [32, 20, 3];
    dataset.arrays.original_images = ndarray::Array4::zeros((4, 32, 20, 3));
    dataset.arrays.depthmaps = ndarray::Array3::zeros((4, 32, 20));
    let other = dir.path().join("other.npz");
    write(&other, &dataset).unwrap();

    let dest = dir.path().join("welded.npz");
    let err = weld(&first, &Container::open(&other).unwrap(), "welded", &dest).unwrap_err();
    match err {
        DatasetError::IncompatibleDatasets { attribute, .. } => {
            assert_eq!(attribute, "original_resolution")
        }
        err => panic!("unexpected error: {err}"),
    }
    assert!(!dest.exists());
}

#[test]
fn test_stale_container_is_rebuilt() {
    let dir = TempDir::new().unwrap();
    let source = build(dir.path(), "set1", 2);
    let mut dataset = source.load().unwrap();
    dataset.attributes.version = FormatVersion { major: 0, minor: 3 };
    let path = source.path().to_path_buf();
    drop(source);
    write(&path, &dataset).unwrap();

    let err = Container::open(&path).err().unwrap();
    assert!(err.is_stale());
    assert!(matches!(err, DatasetError::StaleFormat { .. }));

    let catalog = DatasetCatalog::new(dir.path());
    let rebuilt = catalog.open_or_build("set", &mut builder(100, 0)).unwrap();
    assert_eq!(rebuilt.len(), 2);
    assert_eq!(
        rebuilt.attributes().version,
        robotpose::constants::DATASET_VERSION
    );
}

#[test]
fn test_catalog_builds_from_raw() {
    let dir = TempDir::new().unwrap();
    write_capture(&dir.path().join("raw/set7"), &uniform_frames(2));
    let catalog = DatasetCatalog::new(dir.path());

    let container = catalog.open_or_build("7", &mut builder(100, 0)).unwrap();
    assert_eq!(container.len(), 2);
    assert_eq!(container.path(), catalog.container_path("set7"));
    assert_eq!(catalog.compiled().unwrap(), vec!["set7"]);
}

//! # build_datasets
//!
//! Builds every raw capture under `<DATASETS_DIR>/raw/` into a full dataset.
//! Datasets that are already compiled with a compatible format version are skipped.

use std::path::PathBuf;

use anyhow::Context;
use once_cell::sync::Lazy;
use robotpose::{
    catalog::DatasetCatalog,
    config::{BuildConfig, DATASETS_DIR},
    container::Container,
    pipeline::DatasetBuilder,
    preview::GifPreview,
    segmentation::ForegroundSegmenter,
};

#[macro_use]
extern crate log;

/// Constants can be changed to fit your capture setup.
/// Raw captures are expected under `<DATASETS_DIR>/raw/<name>/`.

/// Optional build configuration, read when present.
static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| DATASETS_DIR.join("build.json"));

/// Height of the segmented crop.
const CROP_HEIGHT: usize = 720;

/// Width of the segmented crop.
const CROP_WIDTH: usize = 720;

/// Per-channel tolerance of the background color.
const BACKGROUND_TOLERANCE: u8 = 8;

/// Rebuild datasets even when a valid container exists.
const FORCE_REBUILD: bool = false;

/// Script entrypoint.
pub fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match CONFIG_PATH.is_file() {
        true => BuildConfig::from_json_file(&CONFIG_PATH)
            .with_context(|| format!("reading {:?}", *CONFIG_PATH))?,
        false => BuildConfig::default(),
    };
    let catalog = DatasetCatalog::new(&DATASETS_DIR);
    let names = catalog.raw()?;
    if names.is_empty() {
        error!("No raw captures found under {:?}.", catalog.raw_dir(""));
        return Ok(());
    }

    for name in names {
        let dest = catalog.container_path(&name);
        if !FORCE_REBUILD && dest.is_file() {
            match Container::open(&dest) {
                Ok(container) => {
                    info!("`{name}` is up to date ({} frames). Skipping ...", container.len());
                    continue;
                }
                Err(err) => warn!("{err}"),
            }
        }

        let mut segmenter = ForegroundSegmenter::new(CROP_HEIGHT, CROP_WIDTH);
        segmenter.tolerance = BACKGROUND_TOLERANCE;
        let preview_dir = dest.parent().map(|x| x.to_path_buf()).unwrap_or_default();
        let mut builder = DatasetBuilder::new(segmenter)
            .with_config(config.clone())
            .with_preview(GifPreview::new(&preview_dir));

        match catalog.build(&name, &mut builder) {
            Ok(path) => info!("Built `{name}` at {path:?}."),
            Err(err) => error!("Cannot build `{name}`: {err}. Skipping ..."),
        }
    }
    Ok(())
}

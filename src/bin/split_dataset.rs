//! # split_dataset
//!
//! Splits a compiled dataset into `train` and `validate` subsets.
//! Every `VALIDATION_STRIDE`-th frame goes to validation, the rest to training.

use anyhow::Context;
use robotpose::{
    catalog::DatasetCatalog,
    config::DATASETS_DIR,
    container::{subset, subset_path, Container},
};

#[macro_use]
extern crate log;

/// Dataset to split.
static DATASET_NAME: &str = "set10";

/// One frame out of this many is held out for validation.
const VALIDATION_STRIDE: usize = 5;

/// Script entrypoint.
pub fn main() -> anyhow::Result<()> {
    env_logger::init();

    let catalog = DatasetCatalog::new(&DATASETS_DIR);
    let src = catalog.container_path(DATASET_NAME);
    let container =
        Container::open(&src).with_context(|| format!("opening dataset `{DATASET_NAME}`"))?;

    let (validate, train): (Vec<usize>, Vec<usize>) =
        (0..container.len()).partition(|idx| idx % VALIDATION_STRIDE == 0);
    for (label, indices) in [("train", train), ("validate", validate)] {
        let dest = subset_path(&src, label)?;
        subset(&container, &indices, label, &dest)?;
        info!("`{label}`: {} frames.", indices.len());
    }
    Ok(())
}

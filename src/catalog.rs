//! # catalog
//!
//! Locates compiled datasets and raw captures under a root directory:
//!
//! ```text
//! <root>/<name>/<name>.npz     compiled containers (previews alongside)
//! <root>/raw/<name>/           raw captures
//! ```

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::DATASETS_DIR;
use crate::constants::CONTAINER_EXTENSION;
use crate::container::Container;
use crate::error::{DatasetError, Result};
use crate::path::{extract_dir_name, walk_dir};
use crate::pipeline::DatasetBuilder;
use crate::segmentation::Segmenter;

/// Directory of raw captures, relative to the catalog root.
pub const RAW_DIR: &str = "raw";

/// A directory of datasets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetCatalog {
    root: PathBuf,
}

impl Default for DatasetCatalog {
    fn default() -> Self {
        Self::new(&DATASETS_DIR)
    }
}

impl DatasetCatalog {
    /// Catalog rooted at `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Catalog root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Container path of dataset `name`.
    pub fn container_path(&self, name: &str) -> PathBuf {
        self.root
            .join(name)
            .join(format!("{name}.{CONTAINER_EXTENSION}"))
    }

    /// Raw capture directory of dataset `name`.
    pub fn raw_dir(&self, name: &str) -> PathBuf {
        self.root.join(RAW_DIR).join(name)
    }

    /// Names of compiled datasets, sorted.
    pub fn compiled(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(vec![]);
        }
        Ok(walk_dir(&self.root)?
            .iter()
            .filter_map(|dir| extract_dir_name(dir))
            .filter(|name| name != RAW_DIR)
            .collect())
    }

    /// Names of raw captures, sorted.
    pub fn raw(&self) -> Result<Vec<String>> {
        let raw_root = self.root.join(RAW_DIR);
        if !raw_root.is_dir() {
            return Ok(vec![]);
        }
        Ok(walk_dir(&raw_root)?
            .iter()
            .filter_map(|dir| extract_dir_name(dir))
            .collect())
    }

    /// Build dataset `name` from its raw capture.
    pub fn build<S: Segmenter>(&self, name: &str, builder: &mut DatasetBuilder<S>) -> Result<PathBuf> {
        builder.build(&self.raw_dir(name), &self.container_path(name))
    }

    /// Open the first dataset whose name contains `query`, building it if needed.
    ///
    /// A compiled dataset is rebuilt from the raw capture of the same name when its
    /// container is missing or out of date. Without a compiled match, the first raw
    /// capture matching `query` is built.
    pub fn open_or_build<S: Segmenter>(
        &self,
        query: &str,
        builder: &mut DatasetBuilder<S>,
    ) -> Result<Container> {
        if let Some(name) = self.compiled()?.into_iter().find(|x| x.contains(query)) {
            let path = self.container_path(&name);
            match path.is_file() {
                true => match Container::open(&path) {
                    Err(err) if err.is_stale() => warn!("{err}; rebuilding."),
                    other => return other,
                },
                false => warn!("Dataset `{name}` has no container; building."),
            }
            if !self.raw_dir(&name).is_dir() {
                return Err(DatasetError::DatasetNotFound(query.to_string()));
            }
            return Container::open(&self.build(&name, builder)?);
        }

        match self.raw()?.into_iter().find(|x| x.contains(query)) {
            Some(name) => {
                info!("Building dataset `{name}` from raw capture.");
                Container::open(&self.build(&name, builder)?)
            }
            None => Err(DatasetError::DatasetNotFound(query.to_string())),
        }
    }
}

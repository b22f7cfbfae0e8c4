//! # path
//!
//! File path traversal utilities.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use itertools::Itertools;

use crate::error::{DatasetError, Result};

/// Recursively collect every file under `root` ending in one of `extensions`.
/// Paths are returned sorted so that independent scans line up frame by frame.
pub fn collect_files(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let mut files = vec![];
    for extension in extensions {
        let pattern = format!("{escaped_root}/**/*.{extension}");
        for entry in glob(&pattern)? {
            let path = entry.map_err(|err| err.into_error())?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    Ok(files.into_iter().sorted().dedup().collect())
}

/// List the immediate sub-directories of `dir`, sorted by name.
pub fn walk_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let dirs = fs::read_dir(dir)?
        .filter_map(|x| x.ok())
        .map(|x| x.path())
        .filter(|x| x.is_dir())
        .sorted()
        .collect();
    Ok(dirs)
}

/// Express `path` relative to `root`, using `/` separators.
pub fn relative_path_string(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .join("/")
}

/// Extract the file stem from a path.
pub fn extract_file_stem(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .and_then(|x| x.to_str())
        .ok_or_else(|| DatasetError::MalformedContainer {
            path: path.to_path_buf(),
            reason: "cannot derive a dataset name from the path".to_string(),
        })?;
    Ok(stem.to_string())
}

/// Extract the final directory name of a path.
pub fn extract_dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|x| x.to_str())
        .map(|x| x.to_string())
}

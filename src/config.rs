//! # config
//!
//! Build configuration and default dataset locations.

use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_FRAMES};
use crate::error::Result;

/// Environment variable overriding [`DATASETS_DIR`].
pub const DATASETS_DIR_ENV: &str = "ROBOTPOSE_DATASETS";

/// Root directory holding compiled datasets and raw captures.
pub static DATASETS_DIR: Lazy<PathBuf> = Lazy::new(|| match std::env::var_os(DATASETS_DIR_ENV) {
    Some(dir) => PathBuf::from(dir),
    None => dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("data/robotpose"),
});

/// Tunables of a dataset build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Frames handed to one worker pool.
    pub batch_size: usize,
    /// Worker threads per pool; `0` uses every available core.
    pub num_workers: usize,
    /// Frames per compressed chunk in the container.
    pub chunk_frames: usize,
    /// DEFLATE level; `None` uses the library default.
    pub compression_level: Option<i32>,
    /// Draw progress bars while loading and cropping.
    pub show_progress: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            num_workers: 0,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            compression_level: None,
            show_progress: true,
        }
    }
}

impl BuildConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Resolved number of worker threads.
    pub fn workers(&self) -> usize {
        match self.num_workers {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::BuildConfig;

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build.json");
        fs::write(&path, r#"{"batch_size": 7, "num_workers": 3}"#).unwrap();

        let config = BuildConfig::from_json_file(&path).unwrap();
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.workers(), 3);
        assert_eq!(config.chunk_frames, BuildConfig::default().chunk_frames);
        assert!(config.show_progress);
    }

    #[test]
    fn test_zero_workers_uses_available_cores() {
        let config = BuildConfig::default();
        assert!(config.workers() >= 1);
    }
}

//! Storage Layer
//!
//! Locates the configuration directory and allocates output files for
//! annotated images. Nothing else is persisted.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("edu", "purdue-events", "post-ocr")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Allocate a fresh, uniquely named `.png` file that outlives this process.
///
/// Uses `dir` when given, the system temp directory otherwise.
pub fn temp_output_path(dir: Option<&Path>) -> std::io::Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("post-ocr-").suffix(".png");

    let file = match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            builder.tempfile_in(dir)?
        }
        None => builder.tempfile()?,
    };

    Ok(file.into_temp_path().keep()?)
}

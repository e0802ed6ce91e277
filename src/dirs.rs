//! Per-user directories for models and settings

use anyhow::Result;
use std::path::PathBuf;

/// Application data directory (model cache lives here)
pub fn get_data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("io", "snaplabel", "snaplabel")
        .ok_or_else(|| anyhow::anyhow!("could not determine data directory"))?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Application configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("io", "snaplabel", "snaplabel")
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

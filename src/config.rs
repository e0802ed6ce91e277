//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Display settings
    pub display: DisplayConfig,
    /// Model settings
    pub model: ModelConfig,
}

/// How classification results are presented
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Number of labels to show
    pub top_n: usize,
    /// Drop labels that normalized to 0%
    pub hide_zero: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            hide_zero: true,
        }
    }
}

/// Classification model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Override the model cache directory
    pub models_dir: Option<PathBuf>,
    /// ONNX Runtime intra-op thread count
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            models_dir: None,
            intra_threads: 4,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load the user's config, falling back to defaults when absent or invalid
pub fn load_or_default() -> AppConfig {
    if let Ok(config_dir) = crate::dirs::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = load_config(&config_path) {
                tracing::info!("Loaded configuration from {:?}", config_path);
                return config;
            }
            tracing::warn!("Could not parse {:?}, using defaults", config_path);
        }
    }
    AppConfig::default()
}

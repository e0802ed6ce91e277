//! Model acquisition and caching
//!
//! Downloads and verifies the classification model and its label
//! vocabulary, keeping them in the per-user data directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Artifact required to run classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// The ONNX classification network (SqueezeNet 1.1)
    Network,
    /// ImageNet label vocabulary, one class per line
    Labels,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Network, ModelKind::Labels];

    /// Filename under the models directory
    pub fn filename(&self) -> &'static str {
        match self {
            ModelKind::Network => "squeezenet1.1.onnx",
            ModelKind::Labels => "synset.txt",
        }
    }

    /// Download URL (ONNX model zoo)
    pub fn download_url(&self) -> &'static str {
        match self {
            ModelKind::Network => {
                "https://github.com/onnx/models/raw/main/validated/vision/classification/squeezenet/model/squeezenet1.1-7.onnx"
            }
            ModelKind::Labels => {
                "https://raw.githubusercontent.com/onnx/models/main/validated/vision/classification/synset.txt"
            }
        }
    }

    /// Plausible file size range in bytes, used as a cheap integrity check
    pub fn expected_size_range(&self) -> (u64, u64) {
        match self {
            ModelKind::Network => (3_000_000, 7_000_000), // ~4.95 MB
            ModelKind::Labels => (10_000, 100_000),       // ~31 KB
        }
    }

    /// Expected SHA-256, when pinned. None skips verification.
    pub fn expected_sha256(&self) -> Option<&'static str> {
        match self {
            ModelKind::Network => None,
            ModelKind::Labels => None,
        }
    }

    /// Display name for status output
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::Network => "Classification Network",
            ModelKind::Labels => "Label Vocabulary",
        }
    }
}

/// Manifest tracking downloaded artifacts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelManifest {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub downloaded_at_unix: u64,
}

/// Availability of one artifact, for status reporting
#[derive(Debug, Clone, Copy)]
pub struct ModelStatus {
    pub kind: ModelKind,
    pub available: bool,
    pub size_bytes: Option<u64>,
}

/// Manages download and caching of model artifacts
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a manager rooted at the default data directory
    pub fn new() -> Result<Self> {
        let models_dir = crate::dirs::get_data_dir()?.join("models");
        Self::with_dir(models_dir)
    }

    /// Create a manager with a custom models directory
    pub fn with_dir(models_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Path where an artifact lives (whether or not it exists yet)
    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        self.models_dir.join(kind.filename())
    }

    /// Whether an artifact exists with a plausible size
    pub fn is_available(&self, kind: ModelKind) -> bool {
        let path = self.model_path(kind);
        match std::fs::metadata(&path) {
            Ok(metadata) => {
                let (min, max) = kind.expected_size_range();
                (min..=max).contains(&metadata.len())
            }
            Err(_) => false,
        }
    }

    /// Whether everything classification needs is present
    pub fn all_available(&self) -> bool {
        ModelKind::ALL.iter().all(|&kind| self.is_available(kind))
    }

    /// Availability of every artifact
    pub fn status(&self) -> Vec<ModelStatus> {
        ModelKind::ALL
            .iter()
            .map(|&kind| ModelStatus {
                kind,
                available: self.is_available(kind),
                size_bytes: std::fs::metadata(self.model_path(kind)).ok().map(|m| m.len()),
            })
            .collect()
    }

    /// Download an artifact if it is not already cached.
    /// Returns the path to the file.
    pub async fn ensure(&self, kind: ModelKind) -> Result<PathBuf> {
        let path = self.model_path(kind);

        if self.is_available(kind) {
            debug!("{} already cached at {:?}", kind.display_name(), path);
            return Ok(path);
        }

        self.download(kind).await?;
        Ok(path)
    }

    /// Download every missing artifact
    pub async fn ensure_all(&self) -> Result<()> {
        for kind in ModelKind::ALL {
            self.ensure(kind).await?;
        }
        Ok(())
    }

    async fn download(&self, kind: ModelKind) -> Result<()> {
        let url = kind.download_url();
        let path = self.model_path(kind);

        if std::env::var("SNAPLABEL_OFFLINE").is_ok() {
            anyhow::bail!(
                "offline mode: download {} manually from {} and place it at {:?}",
                kind.display_name(),
                url,
                path
            );
        }

        info!("Downloading {} from {}", kind.display_name(), url);
        let sha256 = self.fetch_to_file(url, &path, kind).await?;

        if !self.is_available(kind) {
            anyhow::bail!("download of {} completed but failed verification", kind.display_name());
        }

        self.record_in_manifest(kind, &sha256)?;
        info!("Downloaded {} to {:?}", kind.display_name(), path);
        Ok(())
    }

    /// Stream a URL into `path` via a temp file, returning the SHA-256 hex
    async fn fetch_to_file(&self, url: &str, path: &Path, kind: ModelKind) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("failed to create HTTP client")?;

        let response = client
            .get(url)
            .send()
            .await
            .context("failed to send download request")?;

        if !response.status().is_success() {
            anyhow::bail!("download failed with status {}: {}", response.status(), url);
        }

        debug!("Download size: {:?} bytes", response.content_length());

        let temp_path = path.with_extension("tmp");
        let mut file =
            std::fs::File::create(&temp_path).context("failed to create temp file")?;

        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("error reading download stream")?;
            file.write_all(&chunk).context("failed to write to temp file")?;
            hasher.update(&chunk);
        }

        file.flush().context("failed to flush temp file")?;
        drop(file);

        let hash = format!("{:x}", hasher.finalize());
        if let Some(expected) = kind.expected_sha256() {
            if hash != expected {
                std::fs::remove_file(&temp_path).ok();
                anyhow::bail!(
                    "checksum mismatch for {}: expected {}, got {}",
                    kind.filename(),
                    expected,
                    hash
                );
            }
        }

        std::fs::rename(&temp_path, path)
            .context("failed to move downloaded file into place")?;

        Ok(hash)
    }

    fn record_in_manifest(&self, kind: ModelKind, sha256: &str) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();
        let path = self.model_path(kind);
        let metadata = std::fs::metadata(&path)?;

        let info = ModelInfo {
            filename: kind.filename().to_string(),
            size_bytes: metadata.len(),
            sha256: sha256.to_string(),
            downloaded_at_unix: std::time::SystemTime::now()
                .duration_since(std::time::SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };

        if let Some(existing) = manifest
            .models
            .iter_mut()
            .find(|m| m.filename == info.filename)
        {
            *existing = info;
        } else {
            manifest.models.push(info);
        }

        self.save_manifest(&manifest)
    }

    /// Load the manifest, or an empty one if none exists yet
    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let manifest_path = self.models_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(ModelManifest::default())
        }
    }

    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        let manifest_path = self.models_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(manifest_path, content)?;
        Ok(())
    }
}

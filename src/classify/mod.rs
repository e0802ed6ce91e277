//! Image classification boundary
//!
//! Defines the classifier seam and its error taxonomy. Any backend that
//! produces (label, confidence) pairs for an image is interchangeable;
//! the bundled backend runs an ONNX image-classification model.

pub mod labels;
pub mod onnx;
pub mod preprocess;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::ranking::Candidate;

pub use labels::LabelVocabulary;
pub use onnx::OnnxClassifier;

/// Classification failure, with the failing stage kept distinct so callers
/// can present "model missing" differently from "inference failed".
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The model session could not be constructed
    #[error("failed to load model: {0}")]
    ModelLoad(#[source] anyhow::Error),

    /// The model ran but inference failed
    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    /// Inference succeeded but produced no candidates
    #[error("classifier produced no results")]
    NoResults,

    /// The input image could not be decoded
    #[error("could not read image: {0}")]
    InvalidImage(#[source] image::ImageError),
}

/// An image classifier producing ranked raw candidates.
///
/// One call per photo; the returned candidates carry raw scores in
/// [0, 1] and are not yet normalized to percentages.
#[async_trait]
pub trait Classifier {
    async fn classify(&mut self, image_path: &Path) -> Result<Vec<Candidate>, ClassifyError>;
}

//! ONNX Runtime classification backend
//!
//! Runs an ImageNet-style ONNX classifier (SqueezeNet by default) and
//! converts its logits into raw (label, confidence) candidates.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::{debug, info, warn};

use super::labels::LabelVocabulary;
use super::preprocess::{image_to_tensor, softmax, PreprocessConfig};
use super::{Classifier, ClassifyError};
use crate::ranking::Candidate;

/// How many raw candidates to keep before normalization. The presentation
/// layer truncates further; this just bounds the batch handed to it.
const DEFAULT_TOP_K: usize = 10;

/// Image classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    output_name: String,
    vocabulary: LabelVocabulary,
    preprocess: PreprocessConfig,
    top_k: usize,
}

impl OnnxClassifier {
    /// Load the model session and label vocabulary.
    ///
    /// Fails with [`ClassifyError::ModelLoad`] if either cannot be read;
    /// the two inputs are only useful together.
    pub fn load(
        model_path: &Path,
        labels_path: &Path,
        intra_threads: usize,
    ) -> Result<Self, ClassifyError> {
        let vocabulary =
            LabelVocabulary::from_file(labels_path).map_err(ClassifyError::ModelLoad)?;
        if vocabulary.is_empty() {
            return Err(ClassifyError::ModelLoad(anyhow::anyhow!(
                "label vocabulary {:?} is empty",
                labels_path
            )));
        }

        info!("Loading ONNX model from {:?}", model_path);
        let session =
            build_session(model_path, intra_threads).map_err(ClassifyError::ModelLoad)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| ClassifyError::ModelLoad(anyhow::anyhow!("model has no inputs")))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| ClassifyError::ModelLoad(anyhow::anyhow!("model has no outputs")))?;

        info!(
            "Model loaded. Input: {}, output: {}, {} labels",
            input_name,
            output_name,
            vocabulary.len()
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            vocabulary,
            preprocess: PreprocessConfig::default(),
            top_k: DEFAULT_TOP_K,
        })
    }

    fn run_inference(&mut self, image: &image::DynamicImage) -> Result<Vec<f32>, ClassifyError> {
        let size = self.preprocess.input_size as usize;
        let tensor = image_to_tensor(image, &self.preprocess);
        let (data, _) = tensor.into_raw_vec_and_offset();

        let input = Tensor::from_array(([1, 3, size, size], data))
            .map_err(|e| ClassifyError::Inference(e.into()))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ClassifyError::Inference(e.into()))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            ClassifyError::Inference(anyhow::anyhow!("model output {:?} missing", self.output_name))
        })?;

        let (_, logits) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifyError::Inference(e.into()))?;

        Ok(logits.to_vec())
    }
}

fn build_session(model_path: &Path, intra_threads: usize) -> anyhow::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(model_path)
        .context("failed to load ONNX model")?;
    Ok(session)
}

#[async_trait]
impl Classifier for OnnxClassifier {
    async fn classify(&mut self, image_path: &Path) -> Result<Vec<Candidate>, ClassifyError> {
        let image = image::open(image_path).map_err(ClassifyError::InvalidImage)?;
        debug!(
            "Classifying {:?} ({}x{})",
            image_path,
            image.width(),
            image.height()
        );

        let logits = self.run_inference(&image)?;

        if logits.len() != self.vocabulary.len() {
            warn!(
                "Model emitted {} scores for {} labels; extra entries ignored",
                logits.len(),
                self.vocabulary.len()
            );
        }

        let scores = softmax(&logits);

        let mut candidates: Vec<Candidate> = scores
            .iter()
            .enumerate()
            .filter(|(_, score)| score.is_finite())
            .filter_map(|(index, &score)| {
                self.vocabulary
                    .get(index)
                    .map(|label| Candidate::new(label, score))
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(self.top_k);

        if candidates.is_empty() {
            return Err(ClassifyError::NoResults);
        }

        debug!(
            "Top candidate: {} ({:.4})",
            candidates[0].label, candidates[0].confidence
        );

        Ok(candidates)
    }
}

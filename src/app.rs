//! Classification session state
//!
//! A single classification run expressed as an explicit update cycle:
//! a pure `update` function maps (phase, message) to a new phase plus
//! effects, and a small async runner interprets the effects against a
//! [`Classifier`]. No ambient mutable flags; the phase value is the
//! whole session state.

use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;

use tracing::debug;

use crate::classify::{Classifier, ClassifyError};
use crate::ranking::{normalize, Candidate, RankedLabel};

/// Where a classification run currently stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    LoadingModel,
    Classifying,
    /// Normalized results, percentages summing to 100
    Done(Vec<RankedLabel>),
    Failed(Failure),
}

/// Terminal failure states, kept distinct per stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    ModelLoad(String),
    Inference(String),
    NoResults,
    InvalidImage(String),
}

impl From<&ClassifyError> for Failure {
    fn from(error: &ClassifyError) -> Self {
        match error {
            ClassifyError::ModelLoad(e) => Failure::ModelLoad(e.to_string()),
            ClassifyError::Inference(e) => Failure::Inference(e.to_string()),
            ClassifyError::NoResults => Failure::NoResults,
            ClassifyError::InvalidImage(e) => Failure::InvalidImage(e.to_string()),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::ModelLoad(e) => write!(f, "failed to load model: {}", e),
            Failure::Inference(e) => write!(f, "inference failed: {}", e),
            Failure::NoResults => write!(f, "classifier produced no results"),
            Failure::InvalidImage(e) => write!(f, "could not read image: {}", e),
        }
    }
}

/// Messages fed into the update cycle
#[derive(Debug)]
pub enum Msg {
    ClassifyRequested,
    ModelReady,
    ModelFailed(String),
    InferenceFinished(Result<Vec<Candidate>, ClassifyError>),
}

/// Side effects requested by the update function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    LoadModel,
    RunInference,
}

pub fn init() -> Phase {
    Phase::Idle
}

/// Pure transition: consumes the current phase and a message, returns the
/// next phase and the effects to run. Messages that do not apply to the
/// current phase leave it unchanged.
pub fn update(phase: Phase, msg: Msg) -> (Phase, Vec<Effect>) {
    match (phase, msg) {
        (Phase::Idle | Phase::Done(_) | Phase::Failed(_), Msg::ClassifyRequested) => {
            (Phase::LoadingModel, vec![Effect::LoadModel])
        }
        (Phase::LoadingModel, Msg::ModelReady) => (Phase::Classifying, vec![Effect::RunInference]),
        (Phase::LoadingModel, Msg::ModelFailed(reason)) => {
            (Phase::Failed(Failure::ModelLoad(reason)), vec![])
        }
        (Phase::Classifying, Msg::InferenceFinished(Ok(candidates))) => {
            if candidates.is_empty() {
                (Phase::Failed(Failure::NoResults), vec![])
            } else {
                (Phase::Done(normalize(&candidates)), vec![])
            }
        }
        (Phase::Classifying, Msg::InferenceFinished(Err(error))) => {
            (Phase::Failed(Failure::from(&error)), vec![])
        }
        (phase, msg) => {
            debug!("Ignoring {:?} in phase {:?}", msg, phase);
            (phase, vec![])
        }
    }
}

/// Drive one classification run to a terminal phase.
///
/// `load_classifier` is invoked for the `LoadModel` effect; the resulting
/// classifier handles `RunInference`. Always returns `Done` or `Failed`.
pub async fn classify_photo<C, F, Fut>(load_classifier: F, image_path: &Path) -> Phase
where
    C: Classifier,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<C, ClassifyError>>,
{
    let (mut phase, effects) = update(init(), Msg::ClassifyRequested);
    let mut queue: VecDeque<Effect> = effects.into();

    let mut factory = Some(load_classifier);
    let mut classifier: Option<C> = None;

    while let Some(effect) = queue.pop_front() {
        debug!("Running effect {:?}", effect);
        let msg = match effect {
            Effect::LoadModel => match factory.take() {
                Some(load) => match load().await {
                    Ok(loaded) => {
                        classifier = Some(loaded);
                        Msg::ModelReady
                    }
                    Err(error) => Msg::ModelFailed(error.to_string()),
                },
                None => Msg::ModelFailed("model already consumed by this run".to_string()),
            },
            Effect::RunInference => match classifier.as_mut() {
                Some(classifier) => Msg::InferenceFinished(classifier.classify(image_path).await),
                None => Msg::ModelFailed("no classifier loaded".to_string()),
            },
        };

        let (next, effects) = update(phase, msg);
        phase = next;
        queue.extend(effects);
    }

    phase
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;

    /// Test double returning canned classifier output
    struct FakeClassifier {
        result: Option<Result<Vec<Candidate>, ClassifyError>>,
    }

    impl FakeClassifier {
        fn returning(result: Result<Vec<Candidate>, ClassifyError>) -> Self {
            Self {
                result: Some(result),
            }
        }
    }

    #[async_trait]
    impl Classifier for FakeClassifier {
        async fn classify(&mut self, _: &Path) -> Result<Vec<Candidate>, ClassifyError> {
            self.result.take().unwrap_or(Err(ClassifyError::NoResults))
        }
    }

    fn image() -> PathBuf {
        PathBuf::from("photo.jpg")
    }

    #[test]
    fn test_request_from_idle_loads_model() {
        let (phase, effects) = update(Phase::Idle, Msg::ClassifyRequested);
        assert_eq!(phase, Phase::LoadingModel);
        assert_eq!(effects, vec![Effect::LoadModel]);
    }

    #[test]
    fn test_model_ready_starts_inference() {
        let (phase, effects) = update(Phase::LoadingModel, Msg::ModelReady);
        assert_eq!(phase, Phase::Classifying);
        assert_eq!(effects, vec![Effect::RunInference]);
    }

    #[test]
    fn test_model_failure_is_terminal() {
        let (phase, effects) = update(Phase::LoadingModel, Msg::ModelFailed("boom".into()));
        assert_eq!(phase, Phase::Failed(Failure::ModelLoad("boom".into())));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_inference_results_are_normalized() {
        let candidates = vec![
            Candidate::new("cat", 0.42),
            Candidate::new("dog", 0.31),
            Candidate::new("fox", 0.20),
        ];

        let (phase, _) = update(Phase::Classifying, Msg::InferenceFinished(Ok(candidates)));
        let Phase::Done(results) = phase else {
            panic!("expected Done, got {:?}", phase);
        };

        let sum: u32 = results.iter().map(|r| r.percentage as u32).sum();
        assert_eq!(sum, 100);
    }

    #[test]
    fn test_empty_inference_output_fails_with_no_results() {
        let (phase, _) = update(Phase::Classifying, Msg::InferenceFinished(Ok(vec![])));
        assert_eq!(phase, Phase::Failed(Failure::NoResults));
    }

    #[test]
    fn test_stray_message_leaves_phase_unchanged() {
        let (phase, effects) = update(Phase::Idle, Msg::ModelReady);
        assert_eq!(phase, Phase::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_done_phase_accepts_new_request() {
        let done = Phase::Done(vec![]);
        let (phase, effects) = update(done, Msg::ClassifyRequested);
        assert_eq!(phase, Phase::LoadingModel);
        assert_eq!(effects, vec![Effect::LoadModel]);
    }

    #[tokio::test]
    async fn test_full_run_reaches_done() {
        let phase = classify_photo(
            || async {
                Ok(FakeClassifier::returning(Ok(vec![
                    Candidate::new("cat", 0.9),
                    Candidate::new("dog", 0.1),
                ])))
            },
            &image(),
        )
        .await;

        let Phase::Done(results) = phase else {
            panic!("expected Done, got {:?}", phase);
        };
        assert_eq!(results[0].label, "cat");
        assert_eq!(results[0].percentage, 90);
    }

    #[tokio::test]
    async fn test_full_run_surfaces_model_load_failure() {
        let phase = classify_photo(
            || async {
                Err::<FakeClassifier, _>(ClassifyError::ModelLoad(anyhow::anyhow!("missing file")))
            },
            &image(),
        )
        .await;

        assert!(matches!(phase, Phase::Failed(Failure::ModelLoad(_))));
    }

    #[tokio::test]
    async fn test_full_run_surfaces_inference_failure() {
        let phase = classify_photo(
            || async {
                Ok(FakeClassifier::returning(Err(ClassifyError::Inference(
                    anyhow::anyhow!("tensor shape"),
                ))))
            },
            &image(),
        )
        .await;

        assert!(matches!(phase, Phase::Failed(Failure::Inference(_))));
    }
}

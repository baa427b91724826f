//! Inference engine: one forward pass turned into a decision

use crate::error::{Result, ScreeningError};
use crate::models::classifier::{Classifier, OnnxClassifier};
use crate::models::loader::LoadedModel;
use crate::types::{Decision, DecisionResult};
use std::sync::Arc;
use tracing::debug;

/// Wraps a loaded classifier and interprets its outputs.
///
/// Only constructible from an already loaded classifier, so an engine is
/// always ready to score.
#[derive(Clone)]
pub struct InferenceEngine {
    classifier: Arc<dyn Classifier>,
    model_name: String,
    feature_count: usize,
}

impl InferenceEngine {
    /// Create an engine around any classifier expecting `feature_count` inputs
    pub fn new(classifier: Arc<dyn Classifier>, model_name: &str, feature_count: usize) -> Self {
        Self {
            classifier,
            model_name: model_name.to_string(),
            feature_count,
        }
    }

    /// Create an engine from an ONNX model returned by the loader
    pub fn from_loaded(model: LoadedModel) -> Self {
        let name = model.name.clone();
        let feature_count = model.feature_names().len();
        Self::new(Arc::new(OnnxClassifier::new(model)), &name, feature_count)
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Score a single ordered feature vector.
    pub fn score(&self, features: &[f32]) -> Result<DecisionResult> {
        if features.len() != self.feature_count {
            return Err(ScreeningError::Inference(format!(
                "model {} expects {} features, got {}",
                self.model_name,
                self.feature_count,
                features.len()
            )));
        }

        let label = self.classifier.predict_label(features)?;
        let decision = Decision::from_label(label).ok_or_else(|| {
            ScreeningError::Inference(format!("unexpected label {} from {}", label, self.model_name))
        })?;

        let [_, probability_of_denial] = self.classifier.predict_probability(features)?;
        if !(0.0..=1.0).contains(&probability_of_denial) {
            return Err(ScreeningError::Inference(format!(
                "probability {} from {} outside [0, 1]",
                probability_of_denial, self.model_name
            )));
        }

        debug!(
            model = %self.model_name,
            decision = ?decision,
            probability_of_denial = probability_of_denial,
            "Inference complete"
        );

        Ok(DecisionResult::new(decision, probability_of_denial))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Classifier returning fixed outputs and counting calls
    pub(crate) struct FixedClassifier {
        pub label: i64,
        pub p1: f64,
        pub calls: AtomicUsize,
    }

    impl FixedClassifier {
        pub(crate) fn new(label: i64, p1: f64) -> Self {
            Self {
                label,
                p1,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn predict_label(&self, _features: &[f32]) -> Result<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.label)
        }

        fn predict_probability(&self, _features: &[f32]) -> Result<[f64; 2]> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok([1.0 - self.p1, self.p1])
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict_label(&self, _features: &[f32]) -> Result<i64> {
            Err(ScreeningError::Inference("runtime failure".to_string()))
        }

        fn predict_probability(&self, _features: &[f32]) -> Result<[f64; 2]> {
            Err(ScreeningError::Inference("runtime failure".to_string()))
        }
    }

    fn engine(classifier: impl Classifier + 'static, features: usize) -> InferenceEngine {
        InferenceEngine::new(Arc::new(classifier), "fixed", features)
    }

    #[test]
    fn test_label_zero_is_approved() {
        let result = engine(FixedClassifier::new(0, 0.2), 2).score(&[1.0, 2.0]).unwrap();

        assert_eq!(result.label, Decision::Approved);
        assert_eq!(result.probability_of_denial, 0.2);
        assert_eq!(result.displayed_percent(), "80.00%");
    }

    #[test]
    fn test_label_one_is_denied() {
        let result = engine(FixedClassifier::new(1, 0.9), 2).score(&[1.0, 2.0]).unwrap();

        assert_eq!(result.label, Decision::Denied);
        assert_eq!(result.displayed_percent(), "90.00%");
    }

    #[test]
    fn test_shape_mismatch_skips_classifier() {
        let classifier = Arc::new(FixedClassifier::new(0, 0.1));
        let engine = InferenceEngine::new(classifier.clone(), "fixed", 3);

        assert!(matches!(
            engine.score(&[1.0, 2.0]),
            Err(ScreeningError::Inference(_))
        ));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_outputs_are_inference_errors() {
        assert!(engine(FixedClassifier::new(3, 0.5), 1).score(&[0.0]).is_err());
        assert!(engine(FixedClassifier::new(1, 1.5), 1).score(&[0.0]).is_err());
        assert!(engine(FixedClassifier::new(0, f64::NAN), 1).score(&[0.0]).is_err());
    }

    #[test]
    fn test_runtime_failure_is_recoverable() {
        let err = engine(FailingClassifier, 1).score(&[0.0]).unwrap_err();
        assert!(!err.is_fatal());
    }
}

//! Binary classifier capability and its ONNX Runtime adapter

use crate::error::{Result, ScreeningError};
use crate::models::loader::LoadedModel;
use ort::memory::Allocator;
use ort::session::SessionOutputs;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

/// Decision threshold applied when a graph exports no label output
const DERIVED_LABEL_THRESHOLD: f64 = 0.5;

/// A pre-loaded two-class classifier scoring a single row.
///
/// Implementations must be safe to share across request tasks; callers only
/// ever hold a shared reference.
pub trait Classifier: Send + Sync {
    /// Predicted class label for the row (0 or 1)
    fn predict_label(&self, features: &[f32]) -> Result<i64>;

    /// Per-class probabilities `[P(class = 0), P(class = 1)]`
    fn predict_probability(&self, features: &[f32]) -> Result<[f64; 2]>;
}

/// [`Classifier`] backed by an ONNX Runtime session.
///
/// The session needs exclusive access per run, so runs are serialised
/// behind a mutex.
pub struct OnnxClassifier {
    name: String,
    input_name: String,
    label_output: Option<String>,
    probability_output: String,
    session: Mutex<ort::session::Session>,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel) -> Self {
        Self {
            name: model.name,
            input_name: model.input_name,
            label_output: model.label_output,
            probability_output: model.probability_output,
            session: Mutex::new(model.session),
        }
    }

    /// Run the graph once and hand the outputs to `read`
    fn run<T>(&self, features: &[f32], read: impl FnOnce(&SessionOutputs) -> Result<T>) -> Result<T> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))?;

        let mut session = lock_session(&self.session, &self.name);

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;
        read(&outputs)
    }

    /// Extract class probabilities from the probability output.
    /// Handles tensor outputs (XGBoost, RandomForest) and seq(map) outputs (CatBoost, LightGBM).
    fn read_probabilities(&self, outputs: &SessionOutputs) -> Result<[f64; 2]> {
        let output = outputs.get(self.probability_output.as_str()).ok_or_else(|| {
            ScreeningError::Inference(format!(
                "output {} missing from model {}",
                self.probability_output, self.name
            ))
        })?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let probs = probabilities_from_tensor(&dims, data)?;
            debug!(model = %self.name, p1 = probs[1], "Extracted from tensor");
            return Ok(probs);
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return self.read_sequence_map(output);
        }

        Err(ScreeningError::Inference(format!(
            "unsupported probability output type {:?} from model {}",
            output.dtype(),
            self.name
        )))
    }

    /// Extract probabilities from seq(map(int64, float)) format
    fn read_sequence_map(&self, output: &DynValue) -> Result<[f64; 2]> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| ScreeningError::Inference(format!("Failed to downcast to sequence: {}", e)))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        // batch size is always 1
        let map_value = maps
            .first()
            .ok_or_else(|| ScreeningError::Inference("Empty sequence".to_string()))?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
        let probs = probabilities_from_class_map(&kv_pairs)?;
        debug!(model = %self.name, p1 = probs[1], "Extracted from seq(map)");
        Ok(probs)
    }

    fn read_label(&self, outputs: &SessionOutputs) -> Result<i64> {
        let Some(label_output) = &self.label_output else {
            let probs = self.read_probabilities(outputs)?;
            return Ok(label_from_probability(probs[1]));
        };

        let output = outputs.get(label_output.as_str()).ok_or_else(|| {
            ScreeningError::Inference(format!(
                "output {} missing from model {}",
                label_output, self.name
            ))
        })?;

        let (_, data) = output.try_extract_tensor::<i64>()?;
        label_from_tensor(data)
    }
}

impl Classifier for OnnxClassifier {
    fn predict_label(&self, features: &[f32]) -> Result<i64> {
        self.run(features, |outputs| self.read_label(outputs))
    }

    fn predict_probability(&self, features: &[f32]) -> Result<[f64; 2]> {
        self.run(features, |outputs| self.read_probabilities(outputs))
    }
}

/// Lock the session, recovering it if a previous run panicked.
///
/// A panic inside a run leaves no partial state in the session itself, so a
/// poisoned lock is taken over rather than failing every later request.
fn lock_session<'a, T>(session: &'a Mutex<T>, model: &str) -> MutexGuard<'a, T> {
    session.lock().unwrap_or_else(|poisoned| {
        error!(model = %model, "Session lock poisoned by a panicked run, recovering");
        session.clear_poison();
        poisoned.into_inner()
    })
}

/// Label derived from P(class = 1) when the graph exports none
fn label_from_probability(p1: f64) -> i64 {
    i64::from(p1 >= DERIVED_LABEL_THRESHOLD)
}

/// Label of the single scored row
fn label_from_tensor(data: &[i64]) -> Result<i64> {
    match data {
        [label] => Ok(*label),
        [] => Err(ScreeningError::Inference("empty label tensor".to_string())),
        _ => Err(ScreeningError::Inference(format!(
            "label tensor holds {} values for a single row",
            data.len()
        ))),
    }
}

/// Interpret a probability tensor of shape `[1, k]` or `[k]`.
///
/// Two columns are read as per-class probabilities; a single column is taken
/// as P(class = 1). Any other width means the graph is not a two-class model.
fn probabilities_from_tensor(dims: &[i64], data: &[f32]) -> Result<[f64; 2]> {
    let columns = match dims {
        [1, k] | [k] => *k,
        _ => {
            return Err(ScreeningError::Inference(format!(
                "unexpected probability shape {:?}",
                dims
            )))
        }
    };

    match (columns, data) {
        (2, [p0, p1]) => Ok([*p0 as f64, *p1 as f64]),
        (1, [p1]) => Ok([1.0 - *p1 as f64, *p1 as f64]),
        _ => Err(ScreeningError::Inference(format!(
            "probability tensor {:?} holding {} values is not a two-class output",
            dims,
            data.len()
        ))),
    }
}

/// Interpret a class -> probability map from a seq(map) output.
///
/// Only classes 0 and 1 are accepted; a missing class is the complement of
/// the other.
fn probabilities_from_class_map(pairs: &[(i64, f32)]) -> Result<[f64; 2]> {
    if let Some((class, _)) = pairs.iter().find(|(class, _)| !matches!(class, 0 | 1)) {
        return Err(ScreeningError::Inference(format!(
            "class {} in probability map of a two-class model",
            class
        )));
    }

    let class_prob = |class: i64| {
        pairs
            .iter()
            .find(|(id, _)| *id == class)
            .map(|(_, p)| *p as f64)
    };

    match (class_prob(0), class_prob(1)) {
        (Some(p0), Some(p1)) => Ok([p0, p1]),
        (None, Some(p1)) => Ok([1.0 - p1, p1]),
        (Some(p0), None) => Ok([p0, 1.0 - p0]),
        (None, None) => Err(ScreeningError::Inference(
            "No probability found in map".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_column_tensor() {
        let probs = probabilities_from_tensor(&[1, 2], &[0.8, 0.2]).unwrap();
        assert!((probs[0] - 0.8).abs() < 1e-6);
        assert!((probs[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_single_column_tensor() {
        let probs = probabilities_from_tensor(&[1, 1], &[0.25]).unwrap();
        assert_eq!(probs, [0.75, 0.25]);

        let flat = probabilities_from_tensor(&[2], &[0.6, 0.4]).unwrap();
        assert!((flat[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_bad_tensor_shapes() {
        assert!(probabilities_from_tensor(&[2, 2], &[0.1, 0.9, 0.2, 0.8]).is_err());
        assert!(probabilities_from_tensor(&[1, 2], &[0.1]).is_err());
        assert!(probabilities_from_tensor(&[1, 0], &[]).is_err());
    }

    #[test]
    fn test_multiclass_tensor_is_rejected() {
        assert!(matches!(
            probabilities_from_tensor(&[1, 3], &[0.2, 0.3, 0.5]),
            Err(ScreeningError::Inference(_))
        ));
        assert!(probabilities_from_tensor(&[3], &[0.2, 0.3, 0.5]).is_err());
    }

    #[test]
    fn test_class_map() {
        let probs = probabilities_from_class_map(&[(0, 0.75), (1, 0.25)]).unwrap();
        assert_eq!(probs, [0.75, 0.25]);

        let only_denied = probabilities_from_class_map(&[(1, 0.25)]).unwrap();
        assert_eq!(only_denied, [0.75, 0.25]);

        let only_approved = probabilities_from_class_map(&[(0, 0.75)]).unwrap();
        assert_eq!(only_approved, [0.75, 0.25]);

        assert!(probabilities_from_class_map(&[]).is_err());
    }

    #[test]
    fn test_class_map_rejects_extra_classes() {
        let result = probabilities_from_class_map(&[(0, 0.5), (1, 0.25), (2, 0.25)]);
        assert!(matches!(result, Err(ScreeningError::Inference(_))));
    }

    #[test]
    fn test_derived_label_threshold() {
        assert_eq!(label_from_probability(0.49), 0);
        assert_eq!(label_from_probability(0.5), 1);
        assert_eq!(label_from_probability(0.9), 1);
        assert_eq!(label_from_probability(0.0), 0);
    }

    #[test]
    fn test_label_tensor() {
        assert_eq!(label_from_tensor(&[1]).unwrap(), 1);
        assert_eq!(label_from_tensor(&[0]).unwrap(), 0);
        assert!(label_from_tensor(&[]).is_err());
        assert!(label_from_tensor(&[0, 1]).is_err());
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let session = std::sync::Arc::new(Mutex::new(7_u32));

        let poisoner = session.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("run panicked");
        })
        .join();
        assert!(session.is_poisoned());

        assert_eq!(*lock_session(&session, "test"), 7);
        assert!(!session.is_poisoned());
        assert_eq!(*session.lock().unwrap(), 7);
    }
}

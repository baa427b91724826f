//! Error types for the screening service

use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or running the screening pipeline.
///
/// `Load`, `Mismatch` and `InvalidSpec` only occur during startup and abort
/// initialisation. The remaining variants are per-submission and are turned
/// into an error reply at the request boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScreeningError {
    /// Classifier artifact missing, corrupt or incompatible with the runtime
    #[error("Failed to load classifier from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Form fields and model features disagree
    #[error(
        "Feature mismatch: model expects {expected:?}, form provides {provided:?} \
         (missing from form: {missing:?}, unknown to model: {unexpected:?})"
    )]
    Mismatch {
        expected: BTreeSet<String>,
        provided: BTreeSet<String>,
        missing: BTreeSet<String>,
        unexpected: BTreeSet<String>,
    },

    /// Malformed feature specification
    #[error("Invalid feature specification: {0}")]
    InvalidSpec(String),

    /// A required feature was absent when projecting a record
    #[error("Required feature missing from record: {0}")]
    MissingField(String),

    /// The record carries features the form does not declare
    #[error("Unknown features in record: {0:?}")]
    UnknownFields(BTreeSet<String>),

    /// A supplied value falls outside its declared domain
    #[error("Feature {field} = {value} is outside its domain [{min}, {max}]")]
    OutOfDomain {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Scoring call failed
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl ScreeningError {
    /// Build a mismatch error carrying both name sets and their differences.
    pub fn mismatch(expected: BTreeSet<String>, provided: BTreeSet<String>) -> Self {
        let missing = expected.difference(&provided).cloned().collect();
        let unexpected = provided.difference(&expected).cloned().collect();
        ScreeningError::Mismatch {
            expected,
            provided,
            missing,
            unexpected,
        }
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ScreeningError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error prevents the service from starting.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScreeningError::Load { .. }
                | ScreeningError::Mismatch { .. }
                | ScreeningError::InvalidSpec(_)
        )
    }
}

impl From<ort::Error> for ScreeningError {
    fn from(err: ort::Error) -> Self {
        ScreeningError::Inference(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScreeningError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mismatch_reports_differences() {
        let err = ScreeningError::mismatch(names(&["A", "B", "C"]), names(&["A", "B", "D"]));

        match &err {
            ScreeningError::Mismatch {
                missing, unexpected, ..
            } => {
                assert_eq!(missing, &names(&["C"]));
                assert_eq!(unexpected, &names(&["D"]));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let message = err.to_string();
        assert!(message.contains("\"C\""));
        assert!(message.contains("\"D\""));
    }

    #[test]
    fn test_fatality() {
        assert!(ScreeningError::load("model.onnx", "not found").is_fatal());
        assert!(ScreeningError::InvalidSpec("empty".into()).is_fatal());
        assert!(!ScreeningError::MissingField("A".into()).is_fatal());
        assert!(!ScreeningError::Inference("boom".into()).is_fatal());
    }
}

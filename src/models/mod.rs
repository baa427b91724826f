//! ML model inference components

pub mod classifier;
pub mod inference;
pub mod loader;

pub use classifier::{Classifier, OnnxClassifier};
pub use inference::InferenceEngine;
pub use loader::{FeatureInfo, LoadedModel, ModelLoader};

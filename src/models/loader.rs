//! ONNX model loader

use crate::error::{Result, ScreeningError};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Training-time metadata shipped next to the ONNX graph
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureInfo {
    /// Feature names in training column order
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl FeatureInfo {
    /// Read and validate a feature-info document
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ScreeningError::load(path, e))?;
        let info: FeatureInfo =
            serde_json::from_str(&raw).map_err(|e| ScreeningError::load(path, e))?;

        if info.feature_names.is_empty() {
            return Err(ScreeningError::load(path, "feature_names is empty"));
        }
        Ok(info)
    }
}

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output carrying the predicted label, when the graph exports one
    pub label_output: Option<String>,
    /// Output carrying per-class probabilities
    pub probability_output: String,
    /// Declared feature expectations
    pub feature_info: FeatureInfo,
}

impl LoadedModel {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_info.feature_names
    }
}

/// Loader for ONNX classifiers
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a classifier and its feature-info sidecar.
    ///
    /// Every failure maps to [`ScreeningError::Load`].
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        model_path: P,
        feature_info_path: Q,
    ) -> Result<LoadedModel> {
        let model_path = model_path.as_ref();
        let feature_info_path = feature_info_path.as_ref();

        if !model_path.is_file() {
            return Err(ScreeningError::load(model_path, "model file not found"));
        }
        let feature_info = FeatureInfo::from_path(feature_info_path)?;

        let name = feature_info.model_name.clone().unwrap_or_else(|| {
            model_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "classifier".to_string())
        });

        info!(
            model = %name,
            path = %model_path.display(),
            threads = self.onnx_threads,
            "Loading ONNX model"
        );

        let session = self
            .build_session(model_path)
            .map_err(|e| ScreeningError::load(model_path, format!("{e:#}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| ScreeningError::load(model_path, "model declares no inputs"))?;

        if session.inputs.len() > 1 {
            warn!(
                model = %name,
                inputs = session.inputs.len(),
                "Model declares several inputs, feeding the first"
            );
        }

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .map(|o| o.name.clone())
            .ok_or_else(|| ScreeningError::load(model_path, "model exposes no probability output"))?;

        info!(
            model = %name,
            version = feature_info.version.as_deref().unwrap_or("unversioned"),
            input = %input_name,
            label = label_output.as_deref().unwrap_or("<derived>"),
            probabilities = %probability_output,
            features = feature_info.feature_names.len(),
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            session,
            input_name,
            label_output,
            probability_output,
            feature_info,
        })
    }

    fn build_session(&self, path: &Path) -> anyhow::Result<Session> {
        ort::init().commit()?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)?;

        Ok(session)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

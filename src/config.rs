//! Configuration management for the screening service

use crate::types::FeatureSpec;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "HELOC_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    pub form: FormConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming applications
    pub application_subject: String,
    /// Subject for decisions on messages without a reply subject
    pub decision_subject: String,
}

/// Classifier artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Directory containing the model artifact
    pub models_dir: String,
    /// ONNX graph file name
    pub model_file: String,
    /// Feature-info sidecar file name
    #[serde(default = "default_feature_info_file")]
    pub feature_info_file: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_feature_info_file() -> String {
    "feature_info.json".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl ModelConfig {
    pub fn model_path(&self) -> PathBuf {
        Path::new(&self.models_dir).join(&self.model_file)
    }

    pub fn feature_info_path(&self) -> PathBuf {
        Path::new(&self.models_dir).join(&self.feature_info_file)
    }
}

/// Applicant form configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    /// Fields collected from the applicant, validated on load
    pub fields: FeatureSpec,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum submissions scored concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `HELOC_CONFIG` or `config/config.toml`
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// `HELOC__SECTION__KEY` environment variables override file values.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("HELOC").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                application_subject: "heloc.applications".to_string(),
                decision_subject: "heloc.decisions".to_string(),
            },
            model: ModelConfig {
                models_dir: "models".to_string(),
                model_file: "xgboost_heloc_selected.onnx".to_string(),
                feature_info_file: default_feature_info_file(),
                onnx_threads: 1,
            },
            form: FormConfig {
                fields: FeatureSpec::selected(),
            },
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: default_metrics_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

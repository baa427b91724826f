//! Screening service: feature contract and inference engine wired together.
//!
//! Construction performs every startup check. A `Screener` that exists has a
//! loaded classifier and a reconciled contract, so it can serve submissions.

use crate::config::AppConfig;
use crate::error::{Result, ScreeningError};
use crate::feature_contract::FeatureContract;
use crate::models::{InferenceEngine, ModelLoader};
use crate::types::{ApplicantRecord, DecisionResult, FeatureSpec, ScreeningReply};
use tracing::{error, info, warn};

pub struct Screener {
    contract: FeatureContract,
    engine: InferenceEngine,
}

impl Screener {
    /// Load the configured model and reconcile it with the form.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.model.onnx_threads);
        let model = loader.load(
            config.model.model_path(),
            config.model.feature_info_path(),
        )?;

        let model_order = model.feature_names().to_vec();
        let engine = InferenceEngine::from_loaded(model);
        Self::new(config.form.fields.clone(), model_order, engine)
    }

    /// Reconcile a form spec against the model's feature order.
    pub fn new(spec: FeatureSpec, model_order: Vec<String>, engine: InferenceEngine) -> Result<Self> {
        let contract = FeatureContract::reconcile(spec, model_order)?;

        if contract.feature_count() != engine.feature_count() {
            return Err(ScreeningError::InvalidSpec(format!(
                "contract has {} features but model {} consumes {}",
                contract.feature_count(),
                engine.model_name(),
                engine.feature_count()
            )));
        }

        info!(
            model = %engine.model_name(),
            features = contract.feature_count(),
            "Screener ready"
        );

        Ok(Self { contract, engine })
    }

    pub fn contract(&self) -> &FeatureContract {
        &self.contract
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    /// Assemble and score one applicant.
    ///
    /// Contract failures are returned before the classifier is called.
    pub fn assess(&self, record: &ApplicantRecord) -> Result<DecisionResult> {
        let features = self.contract.assemble(record)?;
        self.engine.score(&features)
    }

    /// Request boundary: decode a submission, assess it, and build the reply.
    ///
    /// Never fails; every error becomes an error reply.
    pub fn handle(&self, payload: &[u8]) -> ScreeningReply {
        let record = match serde_json::from_slice::<ApplicantRecord>(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize application");
                return ScreeningReply::rejected("", format!("Malformed application: {}", e));
            }
        };

        match self.assess(&record) {
            Ok(result) => ScreeningReply::decided(&record.application_id, &result),
            Err(e) => {
                match &e {
                    ScreeningError::OutOfDomain { .. } | ScreeningError::UnknownFields(_) => warn!(
                        application_id = %record.application_id,
                        error = %e,
                        "Application rejected"
                    ),
                    ScreeningError::MissingField(_) => error!(
                        application_id = %record.application_id,
                        error = %e,
                        "Application reached the classifier boundary incomplete"
                    ),
                    _ => error!(
                        application_id = %record.application_id,
                        error = %e,
                        "Assessment failed"
                    ),
                }
                ScreeningReply::failed(&record.application_id, &e)
            }
        }
    }
}

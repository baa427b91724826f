//! HELOC Eligibility Screening Library
//!
//! Reconciles an applicant form with a pre-trained binary classifier and
//! turns single-row predictions into approval or denial decisions.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_contract;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod screening;
pub mod types;

pub use config::AppConfig;
pub use consumer::ApplicationConsumer;
pub use error::ScreeningError;
pub use feature_contract::FeatureContract;
pub use models::inference::InferenceEngine;
pub use producer::DecisionProducer;
pub use screening::Screener;
pub use types::{
    applicant::ApplicantRecord,
    decision::{Decision, DecisionResult},
    feature_spec::{FeatureField, FeatureSpec},
    reply::ScreeningReply,
};

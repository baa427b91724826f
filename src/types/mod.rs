//! Type definitions for the screening service

pub mod applicant;
pub mod decision;
pub mod feature_spec;
pub mod reply;

pub use applicant::ApplicantRecord;
pub use decision::{Decision, DecisionResult};
pub use feature_spec::{FeatureField, FeatureSpec};
pub use reply::{ReplyStatus, ScreeningReply};

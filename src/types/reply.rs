//! Reply returned to the form surface for each submission

use crate::error::ScreeningError;
use crate::types::decision::{Decision, DecisionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome category of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    /// The classifier produced a decision
    Decided,
    /// The submission itself was invalid
    Rejected,
    /// The assessment could not be completed
    Failed,
}

/// Message published back for a single application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningReply {
    /// Unique reply identifier
    pub reply_id: String,

    /// Associated application ID
    pub application_id: String,

    pub status: ReplyStatus,

    /// Decision, when one was reached
    pub decision: Option<Decision>,

    /// Raw P(class = 1)
    pub probability_of_denial: Option<f64>,

    /// Probability formatted for display, e.g. `65.00%`
    pub displayed_probability: Option<String>,

    pub headline: String,

    pub message: String,

    #[serde(default)]
    pub advice: String,

    /// Reply generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl ScreeningReply {
    fn base(application_id: &str, status: ReplyStatus, headline: &str, message: String) -> Self {
        Self {
            reply_id: uuid::Uuid::new_v4().to_string(),
            application_id: application_id.to_string(),
            status,
            decision: None,
            probability_of_denial: None,
            displayed_probability: None,
            headline: headline.to_string(),
            message,
            advice: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Reply carrying a classifier decision
    pub fn decided(application_id: &str, result: &DecisionResult) -> Self {
        let mut reply = Self::base(
            application_id,
            ReplyStatus::Decided,
            result.headline(),
            result.message(),
        );
        reply.decision = Some(result.label);
        reply.probability_of_denial = Some(result.probability_of_denial);
        reply.displayed_probability = Some(result.displayed_percent());
        reply.advice = result.advice().to_string();
        reply
    }

    /// Reply for a submission that failed.
    ///
    /// Out-of-domain values and unknown fields are the submitter's to fix and are reported
    /// verbatim; every other error is an internal fault and gets the
    /// generic copy.
    pub fn failed(application_id: &str, error: &ScreeningError) -> Self {
        match error {
            ScreeningError::OutOfDomain { .. } | ScreeningError::UnknownFields(_) => {
                Self::rejected(application_id, error.to_string())
            }
            _ => Self::base(
                application_id,
                ReplyStatus::Failed,
                "Unable to complete assessment",
                "We were unable to complete your eligibility assessment. Please try again later."
                    .to_string(),
            ),
        }
    }

    /// Reply for a malformed or invalid submission
    pub fn rejected(application_id: &str, reason: String) -> Self {
        Self::base(
            application_id,
            ReplyStatus::Rejected,
            "Invalid submission",
            reason,
        )
    }
}

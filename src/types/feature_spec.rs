//! Feature specification: the ordered, typed contract of form fields

use crate::error::{Result, ScreeningError};
use crate::types::applicant::ApplicantRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single named numeric input with its declared domain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureField {
    /// Column name the classifier was trained on
    pub name: String,
    /// Prompt shown by the form surface
    #[serde(default)]
    pub label: String,
    /// Smallest accepted value
    pub min: f64,
    /// Largest accepted value
    pub max: f64,
    /// Value pre-filled by the form surface
    pub default: f64,
}

impl FeatureField {
    pub fn new(name: &str, label: &str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            min,
            max,
            default,
        }
    }

    /// Whether a value lies inside the declared domain
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Ordered sequence of feature fields.
///
/// Construction rejects empty specs, duplicate or blank names, and fields
/// whose default lies outside `[min, max]`. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<FeatureField>", into = "Vec<FeatureField>")]
pub struct FeatureSpec {
    fields: Vec<FeatureField>,
}

impl FeatureSpec {
    /// Build a spec, validating its fields.
    pub fn new(fields: Vec<FeatureField>) -> Result<Self> {
        if fields.is_empty() {
            return Err(ScreeningError::InvalidSpec(
                "at least one feature is required".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(ScreeningError::InvalidSpec(
                    "feature names must not be blank".to_string(),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ScreeningError::InvalidSpec(format!(
                    "duplicate feature name: {}",
                    field.name
                )));
            }
            if !(field.min.is_finite() && field.max.is_finite()) || field.min > field.max {
                return Err(ScreeningError::InvalidSpec(format!(
                    "{}: invalid domain [{}, {}]",
                    field.name, field.min, field.max
                )));
            }
            if !field.contains(field.default) {
                return Err(ScreeningError::InvalidSpec(format!(
                    "{}: default {} outside domain [{}, {}]",
                    field.name, field.default, field.min, field.max
                )));
            }
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FeatureField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FeatureField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order
    pub fn ordered_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Field names as a set, for compatibility checks
    pub fn name_set(&self) -> BTreeSet<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Record populated with every field's default value
    pub fn default_record(&self) -> ApplicantRecord {
        self.fields
            .iter()
            .fold(ApplicantRecord::new(), |record, f| {
                record.with_value(&f.name, f.default)
            })
    }

    /// Ten selected features of the eligibility predictor form.
    pub fn selected() -> Self {
        Self {
            fields: vec![
                FeatureField::new("ExternalRiskEstimate", "Consolidated Risk Estimate", 0.0, 100.0, 70.0),
                FeatureField::new("PercentTradesNeverDelq", "Percent of Trades Never Delinquent", 0.0, 100.0, 90.0),
                FeatureField::new(
                    "MSinceMostRecentInqexcl7days",
                    "Months Since Most Recent Inquiry (excl. 7 days)",
                    0.0,
                    50.0,
                    2.0,
                ),
                FeatureField::new("NetFractionRevolvingBurden", "Net Fraction Revolving Burden", 0.0, 300.0, 30.0),
                FeatureField::new(
                    "NumBank2NatlTradesWHighUtilization",
                    "Bank/National Trades with High Utilization",
                    0.0,
                    20.0,
                    1.0,
                ),
                FeatureField::new(
                    "MaxDelq2PublicRecLast12M",
                    "Max Delinquency/Public Records (Last 12M)",
                    0.0,
                    10.0,
                    1.0,
                ),
                FeatureField::new("AverageMInFile", "Average Months in File", 0.0, 400.0, 80.0),
                FeatureField::new(
                    "NumTrades60Ever2DerogPubRec",
                    "Number of Trades 60+ Ever Delinquent",
                    0.0,
                    50.0,
                    1.0,
                ),
                FeatureField::new("MaxDelqEver", "Max Delinquency Ever", 0.0, 10.0, 3.0),
                FeatureField::new("PercentTradesWBalance", "Percent of Trades with Balance", 0.0, 100.0, 75.0),
            ],
        }
    }

    /// Eight-question screening form.
    ///
    /// `MaxDelq2PublicRecLast12M` uses the bureau delinquency scale:
    /// 0 derogatory comment, 1 120+ days, 2 90 days, 3 60 days, 4 30 days,
    /// 5 unknown delinquency, 7 never delinquent, 8 special case.
    pub fn short_form() -> Self {
        Self {
            fields: vec![
                FeatureField::new("ExternalRiskEstimate", "External risk estimate", 0.0, 100.0, 0.0),
                FeatureField::new(
                    "NetFractionRevolvingBurden",
                    "Revolving credit used relative to credit limit",
                    0.0,
                    300.0,
                    0.0,
                ),
                FeatureField::new(
                    "PercentTradesNeverDelq",
                    "Percentage of credit accounts never delinquent",
                    0.0,
                    100.0,
                    0.0,
                ),
                FeatureField::new(
                    "MSinceMostRecentInqexcl7days",
                    "Months since most recent credit inquiry, excluding the last 7 days",
                    0.0,
                    50.0,
                    0.0,
                ),
                FeatureField::new(
                    "AverageMInFile",
                    "Average number of months credit accounts have been open",
                    0.0,
                    400.0,
                    0.0,
                ),
                FeatureField::new(
                    "MaxDelq2PublicRecLast12M",
                    "Worst delinquency status in the last 12 months",
                    0.0,
                    8.0,
                    7.0,
                ),
                FeatureField::new(
                    "NumSatisfactoryTrades",
                    "Credit accounts in good standing",
                    0.0,
                    75.0,
                    0.0,
                ),
                FeatureField::new(
                    "NumBank2NatlTradesWHighUtilization",
                    "Bank-issued accounts above 30% utilisation",
                    0.0,
                    20.0,
                    0.0,
                ),
            ],
        }
    }
}

impl TryFrom<Vec<FeatureField>> for FeatureSpec {
    type Error = ScreeningError;

    fn try_from(fields: Vec<FeatureField>) -> Result<Self> {
        Self::new(fields)
    }
}

impl From<FeatureSpec> for Vec<FeatureField> {
    fn from(spec: FeatureSpec) -> Self {
        spec.fields
    }
}

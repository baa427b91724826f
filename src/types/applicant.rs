//! Applicant submission data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One applicant's answers, keyed by feature name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantRecord {
    /// Identifier used to correlate logs and replies
    #[serde(default = "new_application_id")]
    pub application_id: String,

    /// Feature name -> submitted value
    pub values: HashMap<String, f64>,

    /// Submission timestamp
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

fn new_application_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ApplicantRecord {
    /// Create an empty record with a fresh identifier
    pub fn new() -> Self {
        Self {
            application_id: new_application_id(),
            values: HashMap::new(),
            submitted_at: Utc::now(),
        }
    }

    /// Set a feature value
    pub fn with_value(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn with_application_id(mut self, application_id: &str) -> Self {
        self.application_id = application_id.to_string();
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Names of all supplied features
    pub fn field_names(&self) -> BTreeSet<String> {
        self.values.keys().cloned().collect()
    }
}

impl Default for ApplicantRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applicant_deserialization_defaults() {
        let json = r#"{"values": {"ExternalRiskEstimate": 72, "AverageMInFile": 80.5}}"#;
        let record: ApplicantRecord = serde_json::from_str(json).unwrap();

        assert!(!record.application_id.is_empty());
        assert_eq!(record.get("ExternalRiskEstimate"), Some(72.0));
        assert_eq!(record.get("AverageMInFile"), Some(80.5));
        assert_eq!(record.get("MaxDelqEver"), None);
    }

    #[test]
    fn test_builder() {
        let record = ApplicantRecord::new()
            .with_application_id("app_001")
            .with_value("A", 10.0)
            .with_value("B", 20.0);

        assert_eq!(record.application_id, "app_001");
        assert_eq!(record.field_names().len(), 2);
    }
}

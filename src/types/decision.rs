//! Classifier decision and its user-facing interpretation

use serde::{Deserialize, Serialize};

/// Binary eligibility outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Label 0: eligible, forwarded to loan officers for manual review
    Approved,
    /// Label 1: does not meet initial eligibility criteria
    Denied,
}

impl Decision {
    /// Map a raw classifier label onto a decision
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Decision::Approved),
            1 => Some(Decision::Denied),
            _ => None,
        }
    }
}

/// Result of one scoring call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub label: Decision,
    /// Raw P(class = 1) as returned by the classifier
    pub probability_of_denial: f64,
}

impl DecisionResult {
    pub fn new(label: Decision, probability_of_denial: f64) -> Self {
        Self {
            label,
            probability_of_denial,
        }
    }

    /// Probability shown alongside the decision.
    ///
    /// Denied shows P(class = 1); Approved shows its complement.
    pub fn displayed_probability(&self) -> f64 {
        match self.label {
            Decision::Denied => self.probability_of_denial,
            Decision::Approved => 1.0 - self.probability_of_denial,
        }
    }

    /// Displayed probability as a percentage with two decimals, e.g. `65.00%`
    pub fn displayed_percent(&self) -> String {
        format!("{:.2}%", self.displayed_probability() * 100.0)
    }

    pub fn probability_caption(&self) -> &'static str {
        match self.label {
            Decision::Denied => "Probability of Denial",
            Decision::Approved => "Probability of Approval",
        }
    }

    pub fn headline(&self) -> &'static str {
        match self.label {
            Decision::Denied => "Application Denied",
            Decision::Approved => "Application Sent for Review",
        }
    }

    /// Full message rendered under the headline
    pub fn message(&self) -> String {
        match self.label {
            Decision::Denied => format!(
                "Unfortunately, your HELOC application does not meet initial eligibility criteria. \
                 {}: {}",
                self.probability_caption(),
                self.displayed_percent()
            ),
            Decision::Approved => format!(
                "Your HELOC application is eligible for further review by loan officers. {}: {}",
                self.probability_caption(),
                self.displayed_percent()
            ),
        }
    }

    pub fn advice(&self) -> &'static str {
        match self.label {
            Decision::Denied => {
                "Improving your credit score, reducing debt, or increasing trade history \
                 may improve future applications."
            }
            Decision::Approved => "Final approval depends on additional verification by the bank.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping() {
        assert_eq!(Decision::from_label(0), Some(Decision::Approved));
        assert_eq!(Decision::from_label(1), Some(Decision::Denied));
        assert_eq!(Decision::from_label(2), None);
    }

    #[test]
    fn test_approved_displays_complement() {
        let result = DecisionResult::new(Decision::Approved, 0.2);
        assert!((result.displayed_probability() - 0.8).abs() < 1e-12);
        assert_eq!(result.displayed_percent(), "80.00%");
        assert_eq!(result.probability_caption(), "Probability of Approval");
    }

    #[test]
    fn test_denied_displays_raw_probability() {
        let result = DecisionResult::new(Decision::Denied, 0.73);
        assert_eq!(result.displayed_probability(), 0.73);
        assert_eq!(result.displayed_percent(), "73.00%");
        assert!(result.message().contains("Probability of Denial: 73.00%"));
    }

    #[test]
    fn test_same_raw_probability_differs_by_branch() {
        let approved = DecisionResult::new(Decision::Approved, 0.3);
        let denied = DecisionResult::new(Decision::Denied, 0.3);
        assert_eq!(approved.displayed_percent(), "70.00%");
        assert_eq!(denied.displayed_percent(), "30.00%");
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&DecisionResult::new(Decision::Denied, 0.5)).unwrap();
        assert!(json.contains("\"denied\""));
    }
}

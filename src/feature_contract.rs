//! Feature contract between the applicant form and the classifier.
//!
//! The classifier consumes a positional vector, so the record assembled from
//! the form must be projected into the exact column order the model was
//! trained on. The contract is reconciled once at startup and is immutable
//! afterwards.

use crate::error::{Result, ScreeningError};
use crate::types::{ApplicantRecord, FeatureSpec};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Check that the form provides exactly the features the model expects.
///
/// Fails with [`ScreeningError::Mismatch`] for any difference: superset,
/// subset or disjoint sets alike.
pub fn validate(expected: &BTreeSet<String>, provided: &BTreeSet<String>) -> Result<()> {
    if expected == provided {
        return Ok(());
    }
    Err(ScreeningError::mismatch(expected.clone(), provided.clone()))
}

/// Project a record into the given column order.
///
/// Output order is fixed by `order`; the record's own ordering is irrelevant.
pub fn to_ordered_vector(record: &ApplicantRecord, order: &[String]) -> Result<Vec<f32>> {
    order
        .iter()
        .map(|name| {
            record
                .get(name)
                .map(|value| value as f32)
                .ok_or_else(|| ScreeningError::MissingField(name.clone()))
        })
        .collect()
}

/// Reject records naming features the spec does not declare.
pub fn check_known_fields(record: &ApplicantRecord, spec: &FeatureSpec) -> Result<()> {
    let unknown: BTreeSet<String> = record
        .values
        .keys()
        .filter(|name| spec.field(name).is_none())
        .cloned()
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ScreeningError::UnknownFields(unknown))
    }
}

/// Check every value in the record against its declared domain.
///
/// Coverage is checked by [`to_ordered_vector`].
pub fn check_domain(record: &ApplicantRecord, spec: &FeatureSpec) -> Result<()> {
    for field in spec.fields() {
        if let Some(value) = record.get(&field.name) {
            if !field.contains(value) {
                return Err(ScreeningError::OutOfDomain {
                    field: field.name.clone(),
                    value,
                    min: field.min,
                    max: field.max,
                });
            }
        }
    }
    Ok(())
}

/// Reconciled form spec and model column order.
#[derive(Debug, Clone)]
pub struct FeatureContract {
    spec: FeatureSpec,
    model_order: Vec<String>,
}

impl FeatureContract {
    /// Reconcile the form's spec against the model's training-time order.
    pub fn reconcile(spec: FeatureSpec, model_order: Vec<String>) -> Result<Self> {
        let expected: BTreeSet<String> = model_order.iter().cloned().collect();
        if expected.len() != model_order.len() {
            return Err(ScreeningError::InvalidSpec(
                "model declares duplicate feature names".to_string(),
            ));
        }
        validate(&expected, &spec.name_set())?;

        let reordered = spec.ordered_names() != model_order;
        info!(
            features = model_order.len(),
            reordered = reordered,
            "Feature contract reconciled"
        );

        Ok(Self { spec, model_order })
    }

    /// Domain-check a record and project it into model order.
    pub fn assemble(&self, record: &ApplicantRecord) -> Result<Vec<f32>> {
        check_known_fields(record, &self.spec)?;
        check_domain(record, &self.spec)?;
        let vector = to_ordered_vector(record, &self.model_order)?;
        debug!(
            application_id = %record.application_id,
            features = vector.len(),
            "Applicant record assembled"
        );
        Ok(vector)
    }

    /// Column order the classifier consumes
    pub fn model_order(&self) -> &[String] {
        &self.model_order
    }

    pub fn feature_count(&self) -> usize {
        self.model_order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureField;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn order(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn spec_ab() -> FeatureSpec {
        FeatureSpec::new(vec![
            FeatureField::new("A", "", 0.0, 100.0, 0.0),
            FeatureField::new("B", "", 0.0, 100.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_validate_accepts_identical_sets() {
        assert!(validate(&names(&["A", "B"]), &names(&["B", "A"])).is_ok());
    }

    #[test]
    fn test_validate_rejects_superset_subset_disjoint() {
        let expected = names(&["A", "B", "C"]);

        for provided in [
            names(&["A", "B", "C", "D"]),
            names(&["A", "B"]),
            names(&["X", "Y", "Z"]),
        ] {
            match validate(&expected, &provided) {
                Err(ScreeningError::Mismatch {
                    expected: e,
                    provided: p,
                    ..
                }) => {
                    assert_eq!(e, expected);
                    assert_eq!(p, provided);
                }
                other => panic!("expected mismatch, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_projection_follows_order() {
        let record = ApplicantRecord::new()
            .with_value("B", 20.0)
            .with_value("A", 10.0);

        assert_eq!(
            to_ordered_vector(&record, &order(&["A", "B"])).unwrap(),
            vec![10.0, 20.0]
        );
        assert_eq!(
            to_ordered_vector(&record, &order(&["B", "A"])).unwrap(),
            vec![20.0, 10.0]
        );
    }

    #[test]
    fn test_projection_is_idempotent_and_order_independent() {
        let forward = ApplicantRecord::new()
            .with_value("A", 1.0)
            .with_value("B", 2.0)
            .with_value("C", 3.0);
        let backward = ApplicantRecord::new()
            .with_value("C", 3.0)
            .with_value("B", 2.0)
            .with_value("A", 1.0);
        let columns = order(&["C", "A", "B"]);

        let first = to_ordered_vector(&forward, &columns).unwrap();
        let second = to_ordered_vector(&forward, &columns).unwrap();
        let permuted = to_ordered_vector(&backward, &columns).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, permuted);
        assert_eq!(first, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_projection_missing_field() {
        let record = ApplicantRecord::new().with_value("A", 10.0);

        assert_eq!(
            to_ordered_vector(&record, &order(&["A", "B"])),
            Err(ScreeningError::MissingField("B".to_string()))
        );
    }

    #[test]
    fn test_check_domain() {
        let spec = spec_ab();
        let ok = ApplicantRecord::new().with_value("A", 0.0).with_value("B", 100.0);
        assert!(check_domain(&ok, &spec).is_ok());

        let high = ApplicantRecord::new().with_value("A", 101.0).with_value("B", 1.0);
        assert!(matches!(
            check_domain(&high, &spec),
            Err(ScreeningError::OutOfDomain { ref field, .. }) if field == "A"
        ));

        let nan = ApplicantRecord::new().with_value("A", 1.0).with_value("B", f64::NAN);
        assert!(check_domain(&nan, &spec).is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let spec = spec_ab();
        let record = ApplicantRecord::new()
            .with_value("A", 10.0)
            .with_value("B", 20.0)
            .with_value("Zz", 1.0);

        assert_eq!(
            check_known_fields(&record, &spec),
            Err(ScreeningError::UnknownFields(names(&["Zz"])))
        );

        let contract = FeatureContract::reconcile(spec, order(&["A", "B"])).unwrap();
        assert!(matches!(
            contract.assemble(&record),
            Err(ScreeningError::UnknownFields(_))
        ));
    }

    #[test]
    fn test_reconcile_with_reordered_model() {
        let contract = FeatureContract::reconcile(spec_ab(), order(&["B", "A"])).unwrap();
        let record = ApplicantRecord::new().with_value("A", 10.0).with_value("B", 20.0);

        assert_eq!(contract.feature_count(), 2);
        assert_eq!(contract.assemble(&record).unwrap(), vec![20.0, 10.0]);
    }

    #[test]
    fn test_reconcile_rejects_mismatch() {
        let result = FeatureContract::reconcile(spec_ab(), order(&["A", "B", "C"]));
        assert!(matches!(result, Err(ScreeningError::Mismatch { .. })));

        let duplicated = FeatureContract::reconcile(spec_ab(), order(&["A", "B", "A"]));
        assert!(matches!(duplicated, Err(ScreeningError::InvalidSpec(_))));
    }

    #[test]
    fn test_assemble_rejects_out_of_domain_before_projection() {
        let contract = FeatureContract::reconcile(spec_ab(), order(&["A", "B"])).unwrap();
        let record = ApplicantRecord::new().with_value("A", -5.0);

        assert!(matches!(
            contract.assemble(&record),
            Err(ScreeningError::OutOfDomain { .. })
        ));
    }
}

//! Mapping heterogeneous FHIR values onto typed record fields.

use chrono::NaiveDate;

use crate::models::{PatientRecord, Ward};

use super::codes::ObservationField;
use super::resources::{Observation, PatientResource};
use super::SyncError;

/// The value shapes an observation can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationValue {
    Boolean(bool),
    Coded(String),
    Quantity { value: f64, unit: Option<String> },
}

impl ObservationValue {
    /// Extract the value from whichever `value[x]` the observation uses.
    pub fn from_observation(obs: &Observation) -> Option<Self> {
        if let Some(b) = obs.value_boolean {
            return Some(Self::Boolean(b));
        }
        if let Some(concept) = &obs.value_codeable_concept {
            let code = concept
                .coding
                .first()
                .and_then(|c| c.code.clone())
                .or_else(|| concept.text.clone())?;
            return Some(Self::Coded(code));
        }
        let quantity = obs.value_quantity.as_ref()?;
        Some(Self::Quantity {
            value: quantity.value?,
            unit: quantity.unit.clone(),
        })
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Coded(_) => "coded concept",
            Self::Quantity { .. } => "quantity",
        }
    }
}

/// Copy name and birth date from a Patient resource into `record`.
/// The first name entry is used: first given name, then family name.
pub fn apply_demographics(record: &mut PatientRecord, patient: &PatientResource) {
    if let Some(name) = patient.name.first() {
        let parts: Vec<&str> = name
            .given
            .first()
            .map(String::as_str)
            .into_iter()
            .chain(name.family.as_deref())
            .collect();
        if !parts.is_empty() {
            record.full_name = Some(parts.join(" "));
        }
    }
    record.birth_date = patient
        .birth_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
}

/// Write an observation value into the record field it belongs to.
///
/// A value whose shape does not fit the field is rejected as malformed
/// and the field is left as it was.
pub fn apply_observation(
    record: &mut PatientRecord,
    field: ObservationField,
    value: ObservationValue,
) -> Result<(), SyncError> {
    match (field, value) {
        (ObservationField::WardAllocation, ObservationValue::Coded(code)) => {
            record.ward_allocation = Some(Ward::from_code(&code));
        }
        (ObservationField::Signal(signal), ObservationValue::Boolean(b)) if signal.is_boolean() => {
            record.set_flag(signal, b);
        }
        (ObservationField::Signal(signal), ObservationValue::Quantity { value, unit })
            if !signal.is_boolean() =>
        {
            if !value.is_finite() {
                return Err(SyncError::Malformed(format!(
                    "{} quantity is not finite",
                    signal.as_str()
                )));
            }
            record.set_quantity(signal, value);
            if let Some(unit) = unit {
                record.units.insert(signal.as_str().to_string(), unit);
            }
        }
        (field, value) => {
            return Err(SyncError::Malformed(format!(
                "{} cannot hold a {} value",
                field.name(),
                value.shape()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhir::resources::{CodeableConcept, HumanName, Quantity};
    use crate::models::Signal;

    fn quantity_obs(value: f64, unit: &str) -> Observation {
        Observation {
            value_quantity: Some(Quantity {
                value: Some(value),
                unit: Some(unit.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn extracts_each_value_shape() {
        let boolean = Observation { value_boolean: Some(true), ..Default::default() };
        assert_eq!(
            ObservationValue::from_observation(&boolean),
            Some(ObservationValue::Boolean(true))
        );

        let coded = Observation {
            value_codeable_concept: Some(CodeableConcept::single(
                "http://loinc.org",
                "intensive care unit",
                "intensive care unit",
            )),
            ..Default::default()
        };
        assert_eq!(
            ObservationValue::from_observation(&coded),
            Some(ObservationValue::Coded("intensive care unit".into()))
        );

        assert_eq!(
            ObservationValue::from_observation(&quantity_obs(0.42, "fL")),
            Some(ObservationValue::Quantity { value: 0.42, unit: Some("fL".into()) })
        );
    }

    #[test]
    fn observation_without_value_yields_none() {
        assert!(ObservationValue::from_observation(&Observation::default()).is_none());
        let empty_quantity = Observation {
            value_quantity: Some(Quantity::default()),
            ..Default::default()
        };
        assert!(ObservationValue::from_observation(&empty_quantity).is_none());
    }

    #[test]
    fn demographics_use_first_given_and_family() {
        let patient = PatientResource {
            birth_date: Some("1990-01-31".into()),
            name: vec![HumanName {
                family: Some("Hopper".into()),
                given: vec!["Grace".into(), "Brewster".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut record = PatientRecord::new("p");
        apply_demographics(&mut record, &patient);
        assert_eq!(record.full_name.as_deref(), Some("Grace Hopper"));
        assert_eq!(record.birth_date, NaiveDate::from_ymd_opt(1990, 1, 31));
    }

    #[test]
    fn partial_birth_date_is_left_absent() {
        let patient = PatientResource {
            birth_date: Some("1990".into()),
            ..Default::default()
        };
        let mut record = PatientRecord::new("p");
        apply_demographics(&mut record, &patient);
        assert!(record.birth_date.is_none());
        assert!(record.full_name.is_none());
    }

    #[test]
    fn quantity_sets_value_and_unit() {
        let mut record = PatientRecord::new("p");
        let value = ObservationValue::from_observation(&quantity_obs(-0.25, "10*3/uL")).unwrap();
        apply_observation(&mut record, ObservationField::Signal(Signal::Platelets), value).unwrap();
        assert_eq!(record.platelets, Some(-0.25));
        assert_eq!(record.units.get("platelets").map(String::as_str), Some("10*3/uL"));
    }

    #[test]
    fn coded_ward_is_lenient() {
        let mut record = PatientRecord::new("p");
        apply_observation(
            &mut record,
            ObservationField::WardAllocation,
            ObservationValue::Coded("unknown bed".into()),
        )
        .unwrap();
        assert_eq!(record.ward_allocation, Some(Ward::NoAllocation));
    }

    #[test]
    fn shape_mismatch_is_malformed() {
        let mut record = PatientRecord::new("p");
        let err = apply_observation(
            &mut record,
            ObservationField::Signal(Signal::TestResult),
            ObservationValue::Quantity { value: 1.0, unit: None },
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Malformed(_)));
        assert!(record.test_result.is_none());

        let err = apply_observation(
            &mut record,
            ObservationField::Signal(Signal::Monocytes),
            ObservationValue::Boolean(true),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Malformed(_)));
    }

    #[test]
    fn non_finite_quantity_is_malformed() {
        let mut record = PatientRecord::new("p");
        let err = apply_observation(
            &mut record,
            ObservationField::Signal(Signal::Leukocytes),
            ObservationValue::Quantity { value: f64::INFINITY, unit: None },
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Malformed(_)));
        assert!(record.leukocytes.is_none());
    }
}

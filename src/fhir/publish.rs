//! Upload imported patients to the remote service and mark them active.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db;
use crate::models::{PatientSource, Signal};

use super::client::RecordService;
use super::codes::{unit_for, ObservationField, OBSERVATION_CODES};
use super::resources::*;
use super::SyncError;

/// Result of one publish run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishSummary {
    pub attempted: usize,
    /// Ids now on the roster, in upload order.
    pub published: Vec<String>,
    pub failed: Vec<String>,
}

/// Patient resource for a source row.
pub fn build_patient_resource(source: &PatientSource) -> PatientResource {
    PatientResource {
        resource_type: "Patient".into(),
        id: Some(source.id.clone()),
        active: Some(true),
        gender: Some(source.gender.as_str().into()),
        birth_date: Some(source.birth_date.to_string()),
        name: vec![HumanName {
            name_use: Some("official".into()),
            family: Some(source.family_name.clone()),
            given: vec![source.given_name.clone()],
            prefix: vec![source.gender.name_prefix().into()],
        }],
    }
}

fn category(code: &str, display: &str) -> CodeableConcept {
    CodeableConcept {
        coding: vec![Coding {
            system: Some(OBSERVATION_CATEGORY_SYSTEM.into()),
            code: Some(code.into()),
            display: Some(display.into()),
        }],
        text: None,
    }
}

/// One Observation per coded field, each with a fresh id, stamped `now`.
pub fn build_observations(source: &PatientSource, now: DateTime<Utc>) -> Vec<Observation> {
    let timestamp = now.to_rfc3339();

    OBSERVATION_CODES
        .iter()
        .map(|entry| {
            let mut obs = Observation {
                resource_type: "Observation".into(),
                id: Some(Uuid::new_v4().to_string()),
                status: Some("final".into()),
                code: Some(CodeableConcept::single(LOINC_SYSTEM, entry.code, entry.display)),
                subject: Some(Reference {
                    reference: Some(format!("Patient/{}", source.id)),
                }),
                effective_date_time: Some(timestamp.clone()),
                issued: Some(timestamp.clone()),
                ..Default::default()
            };

            match entry.field {
                ObservationField::WardAllocation => {
                    let ward = source.ward_allocation.as_str();
                    obs.category = vec![category("survey", "Survey")];
                    obs.value_codeable_concept =
                        Some(CodeableConcept::single(LOINC_SYSTEM, ward, ward));
                }
                ObservationField::Signal(signal) if signal.is_boolean() => {
                    obs.category = vec![category("exam", "Exam")];
                    obs.value_boolean = Some(match signal {
                        Signal::TestResult => source.test_result,
                        _ => source.has_disease,
                    });
                }
                ObservationField::Signal(signal) => {
                    let unit = unit_for(signal);
                    obs.category = vec![category("laboratory", "Laboratory")];
                    obs.value_quantity = Some(Quantity {
                        value: source.quantity(signal),
                        unit: Some(unit.into()),
                        system: Some(UCUM_SYSTEM.into()),
                        code: Some(unit.into()),
                    });
                }
            }
            obs
        })
        .collect()
}

fn publish_one(service: &dyn RecordService, source: &PatientSource) -> Result<(), SyncError> {
    service.put_patient(&build_patient_resource(source))?;
    for obs in build_observations(source, Utc::now()) {
        service.put_observation(&obs)?;
    }
    Ok(())
}

/// Upload the first `sample_size` source rows and make the ones that
/// fully succeeded the new roster.
pub fn publish_sources(
    conn: &Connection,
    service: &dyn RecordService,
    sample_size: usize,
) -> Result<PublishSummary, SyncError> {
    let sources = db::list_patient_sources(conn, Some(sample_size))?;
    let mut summary = PublishSummary {
        attempted: sources.len(),
        ..Default::default()
    };

    for (i, source) in sources.iter().enumerate() {
        match publish_one(service, source) {
            Ok(()) => {
                tracing::info!(progress = %format!("{}/{}", i + 1, sources.len()), "patient published");
                summary.published.push(source.id.clone());
            }
            Err(e) => {
                tracing::warn!(patient_id = %source.id, error = %e, "patient publish failed");
                summary.failed.push(source.id.clone());
            }
        }
    }

    db::replace_roster(conn, &summary.published)?;
    tracing::info!(
        published = summary.published.len(),
        failed = summary.failed.len(),
        "roster replaced"
    );
    Ok(summary)
}

//! Acuity ranking and ward suggestion.
//!
//! Patients are ordered by a composite key, highest priority first:
//!
//! 1. test result, positive first
//! 2. monocytes, descending
//! 3. eosinophils, ascending
//! 4. mean platelet volume, ascending
//! 5. platelets, ascending
//! 6. leukocytes, ascending
//! 7. disease presence, absent first
//!
//! The sort is stable, so patients equal on every key keep their input
//! order. Tiers are then cut by relative position `i / N` and each tier
//! gets a ward suggestion checked against the occupancy counted before
//! the run. Suggestions do not consume capacity.

use std::cmp::Ordering;

use crate::models::{HealthStatus, PatientRecord, Signal, Ward};

use super::capacity::WardCapacity;
use super::types::{RankedPatient, TriageError};

/// Ranking keys extracted from one record. Only built once every
/// signal is present and numeric.
#[derive(Debug, Clone, Copy)]
struct SortKey {
    test_result: bool,
    has_disease: bool,
    leukocytes: f64,
    platelets: f64,
    mean_platelet_volume: f64,
    eosinophils: f64,
    monocytes: f64,
}

impl SortKey {
    fn from_record(record: &PatientRecord) -> Result<Self, TriageError> {
        let flag = |signal: Signal| {
            record.flag(signal).ok_or_else(|| TriageError::MissingSignal {
                patient_id: record.id.clone(),
                signal,
            })
        };
        let quantity = |signal: Signal| -> Result<f64, TriageError> {
            let value = record.quantity(signal).ok_or_else(|| TriageError::MissingSignal {
                patient_id: record.id.clone(),
                signal,
            })?;
            if value.is_nan() {
                return Err(TriageError::InvalidSignal {
                    patient_id: record.id.clone(),
                    signal,
                });
            }
            Ok(value)
        };

        Ok(Self {
            test_result: flag(Signal::TestResult)?,
            has_disease: flag(Signal::DiseasePresence)?,
            leukocytes: quantity(Signal::Leukocytes)?,
            platelets: quantity(Signal::Platelets)?,
            mean_platelet_volume: quantity(Signal::MeanPlateletVolume)?,
            eosinophils: quantity(Signal::Eosinophils)?,
            monocytes: quantity(Signal::Monocytes)?,
        })
    }
}

// NaN is rejected in `SortKey::from_record`, so this is a total order.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn compare_keys(a: &SortKey, b: &SortKey) -> Ordering {
    b.test_result
        .cmp(&a.test_result)
        .then_with(|| cmp_f64(b.monocytes, a.monocytes))
        .then_with(|| cmp_f64(a.eosinophils, b.eosinophils))
        .then_with(|| cmp_f64(a.mean_platelet_volume, b.mean_platelet_volume))
        .then_with(|| cmp_f64(a.platelets, b.platelets))
        .then_with(|| cmp_f64(a.leukocytes, b.leukocytes))
        .then_with(|| a.has_disease.cmp(&b.has_disease))
}

/// Tier for position `index` out of `total`, on half-open bands of
/// `index / total`: [0, 0.1) [0.1, 0.4) [0.4, 0.8) [0.8, 1).
/// Integer arithmetic keeps band edges exact.
pub fn tier_for_position(index: usize, total: usize) -> HealthStatus {
    let scaled = index * 10;
    if scaled < total {
        HealthStatus::Emergent
    } else if scaled < total * 4 {
        HealthStatus::SemiUrgent
    } else if scaled < total * 8 {
        HealthStatus::Warning
    } else {
        HealthStatus::Good
    }
}

/// First ward with room in the tier's preference list, else no allocation.
pub fn suggest_ward(tier: HealthStatus, capacity: &WardCapacity) -> Ward {
    let preferences: &[Ward] = match tier {
        HealthStatus::Emergent => &[Ward::IntensiveCare, Ward::SemiIntensive, Ward::RegularWard],
        HealthStatus::SemiUrgent => &[Ward::SemiIntensive, Ward::RegularWard],
        HealthStatus::Warning => &[Ward::RegularWard],
        HealthStatus::Good => &[],
    };
    preferences
        .iter()
        .copied()
        .find(|ward| capacity.has_room(*ward))
        .unwrap_or(Ward::NoAllocation)
}

/// Rank `patients` by acuity and annotate each with a tier and a ward suggestion.
///
/// Input records are left untouched; the result owns fresh copies.
/// Fails on the first record missing a ranking signal, before any
/// ordering is produced.
pub fn rank(
    patients: &[PatientRecord],
    capacity: &WardCapacity,
) -> Result<Vec<RankedPatient>, TriageError> {
    let mut keyed = patients
        .iter()
        .map(|p| SortKey::from_record(p).map(|key| (key, p)))
        .collect::<Result<Vec<_>, _>>()?;

    // `sort_by` is stable: equal keys keep input order.
    keyed.sort_by(|a, b| compare_keys(&a.0, &b.0));

    let total = keyed.len();
    let ranked = keyed
        .into_iter()
        .enumerate()
        .map(|(position, (_, record))| {
            let health_status = tier_for_position(position, total);
            RankedPatient {
                record: record.clone(),
                position,
                health_status,
                suggested_ward: suggest_ward(health_status, capacity),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(patients = total, "ranking complete");
    Ok(ranked)
}

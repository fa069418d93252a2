use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{HealthStatus, PatientRecord, Signal, Ward};

use super::capacity::WardCapacity;

// ---------------------------------------------------------------------------
// TriageError
// ---------------------------------------------------------------------------

/// Data-integrity failures. Fatal to the ranking run that hit them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriageError {
    #[error("Patient {patient_id} is missing required signal '{signal}'")]
    MissingSignal { patient_id: String, signal: Signal },

    #[error("Patient {patient_id} has a non-numeric value for signal '{signal}'")]
    InvalidSignal { patient_id: String, signal: Signal },
}

// ---------------------------------------------------------------------------
// RankedPatient
// ---------------------------------------------------------------------------

/// A patient record annotated by one ranking run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPatient {
    #[serde(flatten)]
    pub record: PatientRecord,
    /// Zero-based position in the ranking.
    pub position: usize,
    pub health_status: HealthStatus,
    pub suggested_ward: Ward,
}

// ---------------------------------------------------------------------------
// RankingSnapshot
// ---------------------------------------------------------------------------

/// Immutable output of one ranking run, indexed by patient id.
#[derive(Debug, Clone, Serialize)]
pub struct RankingSnapshot {
    pub id: Uuid,
    pub computed_at: DateTime<Utc>,
    /// Occupancy the ward suggestions were computed against.
    pub capacity: WardCapacity,
    pub tier_counts: TierCounts,
    pub patients: Vec<RankedPatient>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl RankingSnapshot {
    pub fn new(patients: Vec<RankedPatient>, capacity: WardCapacity) -> Self {
        let mut index = HashMap::with_capacity(patients.len());
        for (i, p) in patients.iter().enumerate() {
            // Ids are unique upstream; keep the highest-ranked entry if not.
            index.entry(p.record.id.clone()).or_insert(i);
        }
        let tier_counts = TierCounts::from_ranked(&patients);
        Self {
            id: Uuid::new_v4(),
            computed_at: Utc::now(),
            capacity,
            tier_counts,
            patients,
            index,
        }
    }

    pub fn get(&self, patient_id: &str) -> Option<&RankedPatient> {
        self.index.get(patient_id).map(|&i| &self.patients[i])
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

/// Number of patients per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub emergent: usize,
    pub semi_urgent: usize,
    pub warning: usize,
    pub good: usize,
}

impl TierCounts {
    pub fn from_ranked(patients: &[RankedPatient]) -> Self {
        let mut counts = Self::default();
        for p in patients {
            match p.health_status {
                HealthStatus::Emergent => counts.emergent += 1,
                HealthStatus::SemiUrgent => counts.semi_urgent += 1,
                HealthStatus::Warning => counts.warning += 1,
                HealthStatus::Good => counts.good += 1,
            }
        }
        counts
    }
}

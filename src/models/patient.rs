use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{Gender, Signal, Ward};

/// A patient as seen by the triage engine.
///
/// Every clinical field is optional: records synced from the remote
/// service may be partial. Presence is checked before ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub ward_allocation: Option<Ward>,
    pub test_result: Option<bool>,
    pub has_disease: Option<bool>,
    pub leukocytes: Option<f64>,
    pub platelets: Option<f64>,
    pub mean_platelet_volume: Option<f64>,
    pub eosinophils: Option<f64>,
    pub monocytes: Option<f64>,
    /// Unit of measure per quantity signal, keyed by `Signal::as_str`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub units: BTreeMap<String, String>,
}

impl PatientRecord {
    /// Empty record for `id`, every field absent.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: None,
            birth_date: None,
            ward_allocation: None,
            test_result: None,
            has_disease: None,
            leukocytes: None,
            platelets: None,
            mean_platelet_volume: None,
            eosinophils: None,
            monocytes: None,
            units: BTreeMap::new(),
        }
    }

    /// Current allocation, absent treated as no allocation.
    pub fn ward(&self) -> Ward {
        self.ward_allocation.unwrap_or(Ward::NoAllocation)
    }

    pub fn quantity(&self, signal: Signal) -> Option<f64> {
        match signal {
            Signal::Leukocytes => self.leukocytes,
            Signal::Platelets => self.platelets,
            Signal::MeanPlateletVolume => self.mean_platelet_volume,
            Signal::Eosinophils => self.eosinophils,
            Signal::Monocytes => self.monocytes,
            Signal::TestResult | Signal::DiseasePresence => None,
        }
    }

    pub fn set_quantity(&mut self, signal: Signal, value: f64) {
        match signal {
            Signal::Leukocytes => self.leukocytes = Some(value),
            Signal::Platelets => self.platelets = Some(value),
            Signal::MeanPlateletVolume => self.mean_platelet_volume = Some(value),
            Signal::Eosinophils => self.eosinophils = Some(value),
            Signal::Monocytes => self.monocytes = Some(value),
            Signal::TestResult | Signal::DiseasePresence => {}
        }
    }

    pub fn flag(&self, signal: Signal) -> Option<bool> {
        match signal {
            Signal::TestResult => self.test_result,
            Signal::DiseasePresence => self.has_disease,
            _ => None,
        }
    }

    pub fn set_flag(&mut self, signal: Signal, value: bool) {
        match signal {
            Signal::TestResult => self.test_result = Some(value),
            Signal::DiseasePresence => self.has_disease = Some(value),
            _ => {}
        }
    }

    /// Whether the given signal has a value.
    pub fn has_signal(&self, signal: Signal) -> bool {
        if signal.is_boolean() {
            self.flag(signal).is_some()
        } else {
            self.quantity(signal).is_some()
        }
    }

    /// Signals absent from this record, in `Signal::ALL` order.
    pub fn missing_signals(&self) -> Vec<Signal> {
        Signal::ALL
            .into_iter()
            .filter(|s| !self.has_signal(*s))
            .collect()
    }
}

/// A cleaned import row carrying a synthesized identity.
///
/// Unlike `PatientRecord`, every signal is present: rows with gaps
/// are dropped at import time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSource {
    pub id: String,
    pub family_name: String,
    pub given_name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub ward_allocation: Ward,
    pub test_result: bool,
    pub has_disease: bool,
    pub leukocytes: f64,
    pub platelets: f64,
    pub mean_platelet_volume: f64,
    pub eosinophils: f64,
    pub monocytes: f64,
}

impl PatientSource {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }

    /// Numeric value for a quantity signal.
    pub fn quantity(&self, signal: Signal) -> Option<f64> {
        match signal {
            Signal::Leukocytes => Some(self.leukocytes),
            Signal::Platelets => Some(self.platelets),
            Signal::MeanPlateletVolume => Some(self.mean_platelet_volume),
            Signal::Eosinophils => Some(self.eosinophils),
            Signal::Monocytes => Some(self.monocytes),
            Signal::TestResult | Signal::DiseasePresence => None,
        }
    }

    pub fn to_record(&self) -> PatientRecord {
        PatientRecord {
            id: self.id.clone(),
            full_name: Some(self.full_name()),
            birth_date: Some(self.birth_date),
            ward_allocation: Some(self.ward_allocation),
            test_result: Some(self.test_result),
            has_disease: Some(self.has_disease),
            leukocytes: Some(self.leukocytes),
            platelets: Some(self.platelets),
            mean_platelet_volume: Some(self.mean_platelet_volume),
            eosinophils: Some(self.eosinophils),
            monocytes: Some(self.monocytes),
            units: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> PatientSource {
        PatientSource {
            id: "p-1".into(),
            family_name: "Lovelace".into(),
            given_name: "Ada".into(),
            gender: Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(1970, 3, 14).unwrap(),
            ward_allocation: Ward::SemiIntensive,
            test_result: true,
            has_disease: false,
            leukocytes: -0.5,
            platelets: 0.2,
            mean_platelet_volume: 1.1,
            eosinophils: -0.7,
            monocytes: 0.3,
        }
    }

    #[test]
    fn new_record_misses_every_signal() {
        let record = PatientRecord::new("x");
        assert_eq!(record.missing_signals(), Signal::ALL.to_vec());
        assert_eq!(record.ward(), Ward::NoAllocation);
    }

    #[test]
    fn source_converts_to_complete_record() {
        let record = source().to_record();
        assert!(record.missing_signals().is_empty());
        assert_eq!(record.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(record.ward(), Ward::SemiIntensive);
        assert_eq!(record.quantity(Signal::Eosinophils), Some(-0.7));
    }

    #[test]
    fn setters_target_matching_field() {
        let mut record = PatientRecord::new("x");
        record.set_quantity(Signal::Monocytes, 2.5);
        record.set_flag(Signal::DiseasePresence, true);
        assert_eq!(record.monocytes, Some(2.5));
        assert_eq!(record.has_disease, Some(true));
        assert!(record.has_signal(Signal::Monocytes));
        assert!(!record.has_signal(Signal::Leukocytes));
    }
}

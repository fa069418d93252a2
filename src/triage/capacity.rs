use serde::Serialize;

use crate::config;
use crate::models::{PatientRecord, Ward};

/// Fixed ward capacities plus occupancy counted from a patient list.
///
/// Occupancy is never persisted: it is recomputed from each patient's
/// current ward allocation every time a ranking runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WardCapacity {
    pub regular_capacity: u32,
    pub semi_intensive_capacity: u32,
    pub intensive_capacity: u32,
    pub total_capacity: u32,
    pub regular_occupied: u32,
    pub semi_intensive_occupied: u32,
    pub intensive_occupied: u32,
    pub unallocated: u32,
    /// Every counted patient, whichever category it fell into.
    pub current_occupied: u32,
}

impl Default for WardCapacity {
    fn default() -> Self {
        Self {
            regular_capacity: config::REGULAR_WARD_CAPACITY,
            semi_intensive_capacity: config::SEMI_INTENSIVE_CAPACITY,
            intensive_capacity: config::INTENSIVE_CARE_CAPACITY,
            total_capacity: config::TOTAL_CAPACITY,
            regular_occupied: 0,
            semi_intensive_occupied: 0,
            intensive_occupied: 0,
            unallocated: 0,
            current_occupied: 0,
        }
    }
}

impl WardCapacity {
    /// Capacity of a ward. `NoAllocation` has none.
    pub fn capacity(&self, ward: Ward) -> Option<u32> {
        match ward {
            Ward::RegularWard => Some(self.regular_capacity),
            Ward::SemiIntensive => Some(self.semi_intensive_capacity),
            Ward::IntensiveCare => Some(self.intensive_capacity),
            Ward::NoAllocation => None,
        }
    }

    pub fn occupied(&self, ward: Ward) -> u32 {
        match ward {
            Ward::RegularWard => self.regular_occupied,
            Ward::SemiIntensive => self.semi_intensive_occupied,
            Ward::IntensiveCare => self.intensive_occupied,
            Ward::NoAllocation => self.unallocated,
        }
    }

    /// Whether a ward is strictly under capacity.
    pub fn has_room(&self, ward: Ward) -> bool {
        self.capacity(ward)
            .is_some_and(|cap| self.occupied(ward) < cap)
    }

    fn record(&mut self, ward: Ward) {
        match ward {
            Ward::RegularWard => self.regular_occupied += 1,
            Ward::SemiIntensive => self.semi_intensive_occupied += 1,
            Ward::IntensiveCare => self.intensive_occupied += 1,
            Ward::NoAllocation => self.unallocated += 1,
        }
        self.current_occupied += 1;
    }
}

/// Count occupancy from each patient's current ward allocation.
/// Missing allocations count as `NoAllocation`.
pub fn compute_occupancy(patients: &[PatientRecord]) -> WardCapacity {
    let mut capacity = WardCapacity::default();
    for patient in patients {
        capacity.record(patient.ward());
    }
    capacity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_ward(id: &str, ward: Option<Ward>) -> PatientRecord {
        let mut record = PatientRecord::new(id);
        record.ward_allocation = ward;
        record
    }

    #[test]
    fn empty_list_counts_zero_and_keeps_capacities() {
        let capacity = compute_occupancy(&[]);
        assert_eq!(capacity, WardCapacity::default());
        assert_eq!(capacity.regular_capacity, 50);
        assert_eq!(capacity.semi_intensive_capacity, 20);
        assert_eq!(capacity.intensive_capacity, 10);
        assert_eq!(capacity.total_capacity, 80);
        assert_eq!(capacity.current_occupied, 0);
    }

    #[test]
    fn counts_each_ward_and_total() {
        let patients = vec![
            in_ward("a", Some(Ward::RegularWard)),
            in_ward("b", Some(Ward::RegularWard)),
            in_ward("c", Some(Ward::SemiIntensive)),
            in_ward("d", Some(Ward::IntensiveCare)),
            in_ward("e", Some(Ward::NoAllocation)),
        ];
        let capacity = compute_occupancy(&patients);
        assert_eq!(capacity.regular_occupied, 2);
        assert_eq!(capacity.semi_intensive_occupied, 1);
        assert_eq!(capacity.intensive_occupied, 1);
        assert_eq!(capacity.unallocated, 1);
        assert_eq!(capacity.current_occupied, 5);
    }

    #[test]
    fn missing_allocation_counts_as_unallocated() {
        let capacity = compute_occupancy(&[in_ward("a", None)]);
        assert_eq!(capacity.unallocated, 1);
        assert_eq!(capacity.current_occupied, 1);
    }

    #[test]
    fn has_room_is_strict() {
        let patients: Vec<_> = (0..10)
            .map(|i| in_ward(&format!("icu{i}"), Some(Ward::IntensiveCare)))
            .collect();
        let capacity = compute_occupancy(&patients);
        assert!(!capacity.has_room(Ward::IntensiveCare));
        assert!(capacity.has_room(Ward::SemiIntensive));
        assert!(!capacity.has_room(Ward::NoAllocation));
    }
}

//! Last-computed ranking, shared between ranking runs and status lookups.
//!
//! Writers build a complete `RankingSnapshot` off-lock and swap the `Arc`
//! in under a short write lock. Readers clone the `Arc` and release the
//! lock immediately, so a lookup sees either the whole old snapshot or
//! the whole new one.

use std::sync::{Arc, PoisonError, RwLock};

use crate::models::PatientRecord;

use super::capacity::compute_occupancy;
use super::ranking::rank;
use super::types::{RankedPatient, RankingSnapshot, TriageError};

/// Owner of the live ranking snapshot.
#[derive(Debug, Default)]
pub struct TriageBoard {
    current: RwLock<Option<Arc<RankingSnapshot>>>,
}

impl TriageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live snapshot wholesale.
    pub fn publish(&self, snapshot: RankingSnapshot) -> Arc<RankingSnapshot> {
        let snapshot = Arc::new(snapshot);
        // The guarded value is only ever replaced by a single assignment,
        // so a poisoned lock still holds a complete snapshot.
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::clone(&snapshot));
        drop(guard);

        tracing::info!(
            snapshot_id = %snapshot.id,
            patients = snapshot.len(),
            emergent = snapshot.tier_counts.emergent,
            "ranking snapshot published"
        );
        snapshot
    }

    /// The live snapshot, if any ranking has run.
    pub fn current(&self) -> Option<Arc<RankingSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Status of one patient in the live snapshot. `None` when no ranking
    /// has run or the patient was not part of it.
    pub fn get_status(&self, patient_id: &str) -> Option<RankedPatient> {
        self.current()?.get(patient_id).cloned()
    }

    /// Drop the live snapshot.
    pub fn clear(&self) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

/// Count occupancy, rank, and publish the result on `board`.
///
/// A failed ranking publishes nothing; the previous snapshot stays live
/// and the error goes back to the caller.
pub fn run_triage(
    board: &TriageBoard,
    patients: &[PatientRecord],
) -> Result<Arc<RankingSnapshot>, TriageError> {
    let capacity = compute_occupancy(patients);
    let ranked = rank(patients, &capacity).map_err(|e| {
        tracing::warn!(error = %e, "ranking rejected");
        e
    })?;
    Ok(board.publish(RankingSnapshot::new(ranked, capacity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthStatus, Ward};
    use std::thread;

    fn patient(id: &str, test_result: bool, monocytes: f64) -> PatientRecord {
        let mut record = PatientRecord::new(id);
        record.test_result = Some(test_result);
        record.has_disease = Some(false);
        record.leukocytes = Some(0.0);
        record.platelets = Some(0.0);
        record.mean_platelet_volume = Some(0.0);
        record.eosinophils = Some(0.0);
        record.monocytes = Some(monocytes);
        record
    }

    #[test]
    fn lookup_before_any_ranking_is_not_found() {
        let board = TriageBoard::new();
        assert!(board.current().is_none());
        assert!(board.get_status("anyone").is_none());
    }

    #[test]
    fn lookup_returns_ranked_status() {
        let board = TriageBoard::new();
        run_triage(&board, &[patient("B", false, 9.0), patient("A", true, 5.0)]).unwrap();

        let a = board.get_status("A").unwrap();
        assert_eq!(a.position, 0);
        assert_eq!(a.health_status, HealthStatus::Emergent);
        assert_eq!(a.suggested_ward, Ward::IntensiveCare);

        let b = board.get_status("B").unwrap();
        assert_eq!(b.health_status, HealthStatus::Warning);
    }

    #[test]
    fn absent_id_is_not_found() {
        let board = TriageBoard::new();
        run_triage(&board, &[patient("A", true, 5.0)]).unwrap();
        assert!(board.get_status("Z").is_none());
    }

    #[test]
    fn new_run_replaces_snapshot_wholesale() {
        let board = TriageBoard::new();
        let first = run_triage(&board, &[patient("old", true, 1.0)]).unwrap();
        let second = run_triage(&board, &[patient("new", true, 1.0)]).unwrap();

        assert_ne!(first.id, second.id);
        assert!(board.get_status("old").is_none());
        assert!(board.get_status("new").is_some());
        // Readers holding the old snapshot still see it intact
        assert!(first.get("old").is_some());
    }

    #[test]
    fn failed_run_keeps_previous_snapshot() {
        let board = TriageBoard::new();
        run_triage(&board, &[patient("kept", true, 1.0)]).unwrap();

        let mut broken = patient("broken", true, 1.0);
        broken.eosinophils = None;
        assert!(run_triage(&board, &[broken]).is_err());

        assert!(board.get_status("kept").is_some());
        assert!(board.get_status("broken").is_none());
    }

    #[test]
    fn empty_run_publishes_empty_snapshot() {
        let board = TriageBoard::new();
        let snapshot = run_triage(&board, &[]).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.capacity.current_occupied, 0);
    }

    #[test]
    fn clear_drops_snapshot() {
        let board = TriageBoard::new();
        run_triage(&board, &[patient("A", true, 1.0)]).unwrap();
        board.clear();
        assert!(board.current().is_none());
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let board = Arc::new(TriageBoard::new());
        let batch_a: Vec<_> = (0..20).map(|i| patient(&format!("a{i}"), true, i as f64)).collect();
        let batch_b: Vec<_> = (0..30).map(|i| patient(&format!("b{i}"), false, i as f64)).collect();
        run_triage(&board, &batch_a).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let board = Arc::clone(&board);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = board.current().unwrap();
                        let prefix = &snap.patients[0].record.id[..1];
                        assert!(snap.patients.iter().all(|p| p.record.id.starts_with(prefix)));
                        assert!(snap.len() == 20 || snap.len() == 30);
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            run_triage(&board, &batch_b).unwrap();
            run_triage(&board, &batch_a).unwrap();
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}

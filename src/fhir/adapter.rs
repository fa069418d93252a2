//! Store-first record sync.
//!
//! `fetch` answers from the local cache when it can. On a miss it asks
//! the remote service for demographics and one observation per code,
//! normalizes what comes back, caches it, and returns it. Failed
//! lookups leave their field absent; the ranking engine decides later
//! whether that absence matters. A record with any failed lookup is
//! returned but never cached, so the next fetch asks the remote again.

use rusqlite::Connection;

use crate::db;
use crate::models::PatientRecord;

use super::client::RecordService;
use super::codes::OBSERVATION_CODES;
use super::normalize::{apply_demographics, apply_observation, ObservationValue};
use super::SyncError;

/// Per-request sync adapter over one database connection.
pub struct SyncAdapter<'a, S: RecordService + ?Sized> {
    conn: &'a Connection,
    service: &'a S,
}

/// Outcome counters for one remote fetch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FetchStats {
    answered: usize,
    found: usize,
    failed: usize,
}

impl<'a, S: RecordService + ?Sized> SyncAdapter<'a, S> {
    pub fn new(conn: &'a Connection, service: &'a S) -> Self {
        Self { conn, service }
    }

    /// Cached record for `patient_id`, fetched and cached on a miss.
    pub fn fetch(&self, patient_id: &str) -> Result<PatientRecord, SyncError> {
        match db::get_cached_patient(self.conn, patient_id) {
            Ok(Some(record)) => {
                tracing::debug!(patient_id, "patient served from cache");
                return Ok(record);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(patient_id, error = %e, "cache read failed, fetching remotely");
            }
        }
        self.refresh(patient_id)
    }

    /// Fetch from the remote service regardless of the cache, then cache
    /// the record if every lookup answered.
    pub fn refresh(&self, patient_id: &str) -> Result<PatientRecord, SyncError> {
        let (record, stats) = self.fetch_remote(patient_id);

        if stats.answered == 0 {
            return Err(SyncError::Unavailable(patient_id.to_string()));
        }
        if stats.found == 0 && stats.failed == 0 {
            return Err(SyncError::NotFound(patient_id.to_string()));
        }

        if stats.failed > 0 {
            tracing::warn!(
                patient_id,
                failed = stats.failed,
                "partial sync, record not cached"
            );
        } else if let Err(e) = db::upsert_cached_patient(self.conn, &record) {
            tracing::warn!(patient_id, error = %e, "failed to cache synced patient");
        }
        tracing::info!(
            patient_id,
            found = stats.found,
            failed = stats.failed,
            "patient synced from FHIR server"
        );
        Ok(record)
    }

    fn fetch_remote(&self, patient_id: &str) -> (PatientRecord, FetchStats) {
        let mut record = PatientRecord::new(patient_id);
        let mut stats = FetchStats::default();

        match self.service.find_patient(patient_id) {
            Ok(Some(patient)) => {
                stats.answered += 1;
                stats.found += 1;
                apply_demographics(&mut record, &patient);
            }
            Ok(None) => stats.answered += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(patient_id, error = %e, "demographic lookup failed");
            }
        }

        for entry in OBSERVATION_CODES.iter() {
            let observation = match self.service.latest_observation(patient_id, entry.code) {
                Ok(obs) => {
                    stats.answered += 1;
                    obs
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        patient_id,
                        code = entry.code,
                        error = %e,
                        "observation lookup failed, leaving field absent"
                    );
                    continue;
                }
            };

            let Some(value) = observation.as_ref().and_then(ObservationValue::from_observation)
            else {
                continue;
            };
            match apply_observation(&mut record, entry.field, value) {
                Ok(()) => stats.found += 1,
                Err(e) => {
                    tracing::warn!(patient_id, code = entry.code, error = %e, "ignoring observation");
                }
            }
        }

        (record, stats)
    }

    /// Every roster patient, in roster order.
    ///
    /// A patient the remote service cannot produce is returned with all
    /// fields absent rather than dropped, so ranking reports it instead of
    /// silently leaving it out.
    pub fn fetch_roster(&self) -> Result<Vec<PatientRecord>, SyncError> {
        let roster = db::get_roster(self.conn)?;
        let mut records = Vec::with_capacity(roster.len());
        for patient_id in roster {
            match self.fetch(&patient_id) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(patient_id = %patient_id, error = %e, "roster patient unavailable");
                    records.push(PatientRecord::new(patient_id));
                }
            }
        }
        Ok(records)
    }
}

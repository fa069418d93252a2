//! Shared application state for the HTTP surface.
//!
//! `CoreState` owns the configuration, the live ranking board and the
//! remote record service. Every operation opens its own SQLite
//! connection, so callers may run them concurrently from worker threads.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{self, ClearedCounts};
use crate::fhir::{publish_sources, PublishSummary, RecordService, SyncAdapter, SyncError};
use crate::import::{import_rows, CleanedRow, ImportError, ImportSummary};
use crate::models::PatientRecord;
use crate::triage::{run_triage, RankedPatient, RankingSnapshot, TriageBoard, TriageError};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

/// Application state, wrapped in `Arc` at startup and shared by handlers.
///
/// All methods block (SQLite, blocking HTTP); async callers go through
/// `spawn_blocking`.
pub struct CoreState {
    pub config: AppConfig,
    board: TriageBoard,
    service: Arc<dyn RecordService>,
}

impl CoreState {
    pub fn new(config: AppConfig, service: Arc<dyn RecordService>) -> Self {
        Self {
            config,
            board: TriageBoard::new(),
            service,
        }
    }

    /// Open a connection to the configured database, migrating if needed.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.config.db_path).map_err(CoreError::Database)
    }

    pub fn board(&self) -> &TriageBoard {
        &self.board
    }

    /// Patients in the live snapshot, zero when none has been computed.
    pub fn snapshot_size(&self) -> usize {
        self.board.current().map(|s| s.len()).unwrap_or(0)
    }

    // ── Triage ──────────────────────────────────────────────

    /// Sync every roster patient, rank them, and publish the snapshot.
    pub fn triage(&self) -> Result<Arc<RankingSnapshot>, CoreError> {
        let conn = self.open_db()?;
        let patients = SyncAdapter::new(&conn, self.service.as_ref()).fetch_roster()?;
        Ok(run_triage(&self.board, &patients)?)
    }

    /// Status of one patient in the live snapshot.
    pub fn patient_status(&self, patient_id: &str) -> Option<RankedPatient> {
        self.board.get_status(patient_id)
    }

    // ── Records ─────────────────────────────────────────────

    /// Record for one patient, store first.
    pub fn patient_record(&self, patient_id: &str) -> Result<PatientRecord, CoreError> {
        let conn = self.open_db()?;
        Ok(SyncAdapter::new(&conn, self.service.as_ref()).fetch(patient_id)?)
    }

    pub fn import(&self, rows: &[CleanedRow]) -> Result<ImportSummary, CoreError> {
        let conn = self.open_db()?;
        let today = chrono::Local::now().date_naive();
        Ok(import_rows(&conn, rows, &mut rand::thread_rng(), today)?)
    }

    pub fn publish(&self) -> Result<PublishSummary, CoreError> {
        let conn = self.open_db()?;
        Ok(publish_sources(
            &conn,
            self.service.as_ref(),
            self.config.sample_size,
        )?)
    }

    /// Drop cached records and the live snapshot. Sources and roster stay,
    /// so the next triage run re-syncs every roster patient.
    pub fn clear_cache(&self) -> Result<ClearedCounts, CoreError> {
        let conn = self.open_db()?;
        let cached = db::clear_patient_cache(&conn)?;
        self.board.clear();
        tracing::info!(cached, "record cache cleared");
        Ok(ClearedCounts {
            cached,
            ..ClearedCounts::default()
        })
    }

    /// Empty every local table and drop the live snapshot.
    pub fn clear_store(&self) -> Result<ClearedCounts, CoreError> {
        let conn = self.open_db()?;
        let counts = db::clear_all(&conn)?;
        self.board.clear();
        tracing::info!(
            sources = counts.sources,
            cached = counts.cached,
            roster = counts.roster,
            "local store cleared"
        );
        Ok(counts)
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("Data integrity error: {0}")]
    Triage(#[from] TriageError),
    #[error("Import error: {0}")]
    Import(#[from] ImportError),
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

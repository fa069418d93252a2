//! Identity synthesizer: turns cleaned dataset rows into source patients
//! with generated names, genders, birth dates and ids.

pub mod names;
pub mod synthesize;

pub use synthesize::*;

use chrono::NaiveDate;
use rand::Rng;
use rusqlite::Connection;
use thiserror::Error;

use crate::db::{self, DatabaseError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Import batch is empty")]
    EmptyBatch,

    #[error("No complete rows in batch of {0}")]
    NoCompleteRows(usize),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Synthesize identities for `rows` and replace the source table with them.
///
/// A batch with no complete row is rejected and the existing source
/// table is left untouched.
pub fn import_rows<R: Rng + ?Sized>(
    conn: &Connection,
    rows: &[CleanedRow],
    rng: &mut R,
    today: NaiveDate,
) -> Result<ImportSummary, ImportError> {
    if rows.is_empty() {
        return Err(ImportError::EmptyBatch);
    }

    let (sources, summary) = synthesize_patients(rows, rng, today);
    if sources.is_empty() {
        return Err(ImportError::NoCompleteRows(summary.rows_read));
    }

    db::replace_patient_sources(conn, &sources)?;
    tracing::info!(
        rows_read = summary.rows_read,
        rows_kept = summary.rows_kept,
        rows_dropped = summary.rows_dropped,
        "source patients imported"
    );
    Ok(summary)
}

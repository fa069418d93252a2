//! Repository layer: table-scoped database operations.
//!
//! `patient_source` holds imported rows, `patient_cache` holds records
//! mirrored from the remote service, `roster` lists the active patients.

mod patient_cache;
mod patient_source;
mod roster;

use rusqlite::Connection;

use super::DatabaseError;

pub use patient_cache::*;
pub use patient_source::*;
pub use roster::*;

/// Counts removed by a full clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct ClearedCounts {
    pub sources: usize,
    pub cached: usize,
    pub roster: usize,
}

/// Empty every patient table in one transaction.
pub fn clear_all(conn: &Connection) -> Result<ClearedCounts, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let counts = ClearedCounts {
        sources: clear_patient_sources(&tx)?,
        cached: clear_patient_cache(&tx)?,
        roster: clear_roster(&tx)?,
    };
    tx.commit()?;
    Ok(counts)
}

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

/// Insert or overwrite the cached copy of a synced record.
/// Concurrent fetches of the same patient race harmlessly: last writer wins.
pub fn upsert_cached_patient(conn: &Connection, record: &PatientRecord) -> Result<(), DatabaseError> {
    write_cached(conn, record)
}

/// Bulk upsert in a single transaction.
pub fn upsert_cached_patients(
    conn: &Connection,
    records: &[PatientRecord],
) -> Result<usize, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    for record in records {
        write_cached(&tx, record)?;
    }
    tx.commit()?;
    Ok(records.len())
}

fn write_cached(conn: &Connection, record: &PatientRecord) -> Result<(), DatabaseError> {
    let units = serde_json::to_string(&record.units)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    conn.execute(
        "INSERT INTO patient_cache (id, full_name, birth_date, ward_allocation, test_result,
         has_disease, leukocytes, platelets, mean_platelet_volume, eosinophils, monocytes,
         units, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
            full_name = excluded.full_name,
            birth_date = excluded.birth_date,
            ward_allocation = excluded.ward_allocation,
            test_result = excluded.test_result,
            has_disease = excluded.has_disease,
            leukocytes = excluded.leukocytes,
            platelets = excluded.platelets,
            mean_platelet_volume = excluded.mean_platelet_volume,
            eosinophils = excluded.eosinophils,
            monocytes = excluded.monocytes,
            units = excluded.units,
            fetched_at = excluded.fetched_at",
        params![
            record.id,
            record.full_name,
            record.birth_date.map(|d| d.to_string()),
            record.ward_allocation.map(|w| w.as_str()),
            record.test_result,
            record.has_disease,
            record.leukocytes,
            record.platelets,
            record.mean_platelet_volume,
            record.eosinophils,
            record.monocytes,
            units,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_cached_patient(conn: &Connection, id: &str) -> Result<Option<PatientRecord>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, full_name, birth_date, ward_allocation, test_result, has_disease,
             leukocytes, platelets, mean_platelet_volume, eosinophils, monocytes, units
             FROM patient_cache WHERE id = ?1",
            params![id],
            cached_row_from_rusqlite,
        )
        .optional()?;
    row.map(cached_from_row).transpose()
}

pub fn count_cached_patients(conn: &Connection) -> Result<usize, DatabaseError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM patient_cache", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Drop every cached record. Returns the number removed.
pub fn clear_patient_cache(conn: &Connection) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM patient_cache", [])?)
}

struct CachedRow {
    id: String,
    full_name: Option<String>,
    birth_date: Option<String>,
    ward_allocation: Option<String>,
    test_result: Option<bool>,
    has_disease: Option<bool>,
    leukocytes: Option<f64>,
    platelets: Option<f64>,
    mean_platelet_volume: Option<f64>,
    eosinophils: Option<f64>,
    monocytes: Option<f64>,
    units: String,
}

fn cached_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<CachedRow, rusqlite::Error> {
    Ok(CachedRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        birth_date: row.get(2)?,
        ward_allocation: row.get(3)?,
        test_result: row.get(4)?,
        has_disease: row.get(5)?,
        leukocytes: row.get(6)?,
        platelets: row.get(7)?,
        mean_platelet_volume: row.get(8)?,
        eosinophils: row.get(9)?,
        monocytes: row.get(10)?,
        units: row.get(11)?,
    })
}

fn cached_from_row(row: CachedRow) -> Result<PatientRecord, DatabaseError> {
    let units: BTreeMap<String, String> = serde_json::from_str(&row.units)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("units: {e}")))?;
    Ok(PatientRecord {
        id: row.id,
        full_name: row.full_name,
        birth_date: row
            .birth_date
            .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| DatabaseError::ConstraintViolation(format!("birth_date: {e}")))?,
        ward_allocation: row
            .ward_allocation
            .map(|s| Ward::from_str(&s))
            .transpose()?,
        test_result: row.test_result,
        has_disease: row.has_disease,
        leukocytes: row.leukocytes,
        platelets: row.platelets,
        mean_platelet_volume: row.mean_platelet_volume,
        eosinophils: row.eosinophils,
        monocytes: row.monocytes,
        units,
    })
}

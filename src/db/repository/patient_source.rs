use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const SOURCE_COLUMNS: &str = "id, family_name, given_name, gender, birth_date, ward_allocation,
     test_result, has_disease, leukocytes, platelets, mean_platelet_volume,
     eosinophils, monocytes";

/// Append source rows after any existing ones, in a single transaction.
pub fn insert_patient_sources(
    conn: &Connection,
    sources: &[PatientSource],
) -> Result<usize, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let start: i64 = tx.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM patient_source",
        [],
        |row| row.get(0),
    )?;
    write_sources(&tx, sources, start)?;
    tx.commit()?;
    Ok(sources.len())
}

/// Replace the whole source table with `sources`. All or nothing.
pub fn replace_patient_sources(
    conn: &Connection,
    sources: &[PatientSource],
) -> Result<usize, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM patient_source", [])?;
    write_sources(&tx, sources, 0)?;
    tx.commit()?;
    Ok(sources.len())
}

fn write_sources(
    conn: &Connection,
    sources: &[PatientSource],
    start: i64,
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO patient_source (id, position, family_name, given_name, gender,
         birth_date, ward_allocation, test_result, has_disease, leukocytes, platelets,
         mean_platelet_volume, eosinophils, monocytes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )?;
    for (offset, source) in sources.iter().enumerate() {
        stmt.execute(params![
            source.id,
            start + offset as i64,
            source.family_name,
            source.given_name,
            source.gender.as_str(),
            source.birth_date.to_string(),
            source.ward_allocation.as_str(),
            source.test_result,
            source.has_disease,
            source.leukocytes,
            source.platelets,
            source.mean_platelet_volume,
            source.eosinophils,
            source.monocytes,
        ])?;
    }
    Ok(())
}

pub fn get_patient_source(
    conn: &Connection,
    id: &str,
) -> Result<Option<PatientSource>, DatabaseError> {
    let sql = format!("SELECT {SOURCE_COLUMNS} FROM patient_source WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], source_row_from_rusqlite)
        .optional()?;
    row.map(source_from_row).transpose()
}

/// Source rows in import order, optionally limited to the first `limit`.
pub fn list_patient_sources(
    conn: &Connection,
    limit: Option<usize>,
) -> Result<Vec<PatientSource>, DatabaseError> {
    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let sql = format!(
        "SELECT {SOURCE_COLUMNS} FROM patient_source ORDER BY position ASC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit], source_row_from_rusqlite)?;

    let mut sources = Vec::new();
    for row in rows {
        sources.push(source_from_row(row?)?);
    }
    Ok(sources)
}

pub fn count_patient_sources(conn: &Connection) -> Result<usize, DatabaseError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM patient_source", [], |row| row.get(0))?;
    Ok(count as usize)
}

pub fn clear_patient_sources(conn: &Connection) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM patient_source", [])?)
}

// Internal row type for PatientSource mapping
struct SourceRow {
    id: String,
    family_name: String,
    given_name: String,
    gender: String,
    birth_date: String,
    ward_allocation: String,
    test_result: bool,
    has_disease: bool,
    leukocytes: f64,
    platelets: f64,
    mean_platelet_volume: f64,
    eosinophils: f64,
    monocytes: f64,
}

fn source_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<SourceRow, rusqlite::Error> {
    Ok(SourceRow {
        id: row.get(0)?,
        family_name: row.get(1)?,
        given_name: row.get(2)?,
        gender: row.get(3)?,
        birth_date: row.get(4)?,
        ward_allocation: row.get(5)?,
        test_result: row.get(6)?,
        has_disease: row.get(7)?,
        leukocytes: row.get(8)?,
        platelets: row.get(9)?,
        mean_platelet_volume: row.get(10)?,
        eosinophils: row.get(11)?,
        monocytes: row.get(12)?,
    })
}

fn source_from_row(row: SourceRow) -> Result<PatientSource, DatabaseError> {
    Ok(PatientSource {
        birth_date: NaiveDate::parse_from_str(&row.birth_date, "%Y-%m-%d")
            .map_err(|e| DatabaseError::ConstraintViolation(format!("birth_date: {e}")))?,
        gender: Gender::from_str(&row.gender)?,
        ward_allocation: Ward::from_str(&row.ward_allocation)?,
        id: row.id,
        family_name: row.family_name,
        given_name: row.given_name,
        test_result: row.test_result,
        has_disease: row.has_disease,
        leukocytes: row.leukocytes,
        platelets: row.platelets,
        mean_platelet_volume: row.mean_platelet_volume,
        eosinophils: row.eosinophils,
        monocytes: row.monocytes,
    })
}

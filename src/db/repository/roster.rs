use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Replace the active roster. Order is preserved; duplicates are rejected.
pub fn replace_roster(conn: &Connection, patient_ids: &[String]) -> Result<usize, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM roster", [])?;
    {
        let mut stmt = tx.prepare("INSERT INTO roster (position, patient_id) VALUES (?1, ?2)")?;
        for (position, id) in patient_ids.iter().enumerate() {
            stmt.execute(params![position as i64, id]).map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DatabaseError::ConstraintViolation(format!("duplicate roster id {id}"))
                }
                other => DatabaseError::Sqlite(other),
            })?;
        }
    }
    tx.commit()?;
    Ok(patient_ids.len())
}

/// Active patient ids in roster order.
pub fn get_roster(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT patient_id FROM roster ORDER BY position ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

pub fn clear_roster(conn: &Connection) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM roster", [])?)
}

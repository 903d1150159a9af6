use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::AdministrationStatus;
use crate::models::AdministrationEvent;

pub fn insert_administration(
    conn: &Connection,
    event: &AdministrationEvent,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO administrations (id, medication_id, status, given_at, given_by, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.id.to_string(),
            event.medication_id.to_string(),
            event.status.as_str(),
            event.given_at,
            event.given_by,
            event.notes,
        ],
    )?;
    Ok(())
}

/// Full administration history for a medication, oldest first.
pub fn get_administrations_for_medication(
    conn: &Connection,
    med_id: &Uuid,
) -> Result<Vec<AdministrationEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, medication_id, status, given_at, given_by, notes
         FROM administrations WHERE medication_id = ?1
         ORDER BY given_at ASC",
    )?;

    let rows = stmt.query_map(params![med_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, NaiveDateTime>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (id, med_id, status, given_at, given_by, notes) = row?;
        events.push(AdministrationEvent {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            medication_id: Uuid::parse_str(&med_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            status: AdministrationStatus::from_str(&status)?,
            given_at,
            given_by,
            notes,
        });
    }
    Ok(events)
}

/// The most recent `administered` event for a medication, if any.
pub fn last_administered(
    conn: &Connection,
    med_id: &Uuid,
) -> Result<Option<(NaiveDateTime, String)>, DatabaseError> {
    let result = conn.query_row(
        "SELECT given_at, given_by FROM administrations
         WHERE medication_id = ?1 AND status = 'administered'
         ORDER BY given_at DESC LIMIT 1",
        params![med_id.to_string()],
        |row| Ok((row.get::<_, NaiveDateTime>(0)?, row.get::<_, String>(1)?)),
    );
    match result {
        Ok(pair) => Ok(Some(pair)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

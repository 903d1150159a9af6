use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::MedicationStatus;
use crate::models::Medication;
use crate::schedule::ScheduleTime;

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    let schedule_json = encode_schedule(&med.scheduled_times)?;
    conn.execute(
        "INSERT INTO medications (id, patient_id, name, dose, route, scheduled_times,
         is_prn, status, prescribed_by, notes, started_at, stopped_at, stop_reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            med.id.to_string(),
            med.patient_id.to_string(),
            med.name,
            med.dose,
            med.route,
            schedule_json,
            med.is_prn as i32,
            med.status.as_str(),
            med.prescribed_by,
            med.notes,
            med.started_at,
            med.stopped_at,
            med.stop_reason,
        ],
    )?;
    Ok(())
}

pub fn get_medication(conn: &Connection, med_id: &Uuid) -> Result<Medication, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, name, dose, route, scheduled_times, is_prn,
             status, prescribed_by, notes, started_at, stopped_at, stop_reason
             FROM medications WHERE id = ?1",
            params![med_id.to_string()],
            |row| Ok(medication_row_from_rusqlite(row)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "medication".into(),
                id: med_id.to_string(),
            },
            other => DatabaseError::from(other),
        })?;
    medication_from_row(row?)
}

/// A patient's medications, active first, newest prescription first within group.
pub fn get_medications_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, name, dose, route, scheduled_times, is_prn,
         status, prescribed_by, notes, started_at, stopped_at, stop_reason
         FROM medications WHERE patient_id = ?1
         ORDER BY CASE status WHEN 'active' THEN 1 WHEN 'stopped' THEN 2 END ASC,
                  started_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok(medication_row_from_rusqlite(row))
    })?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row??)?);
    }
    Ok(meds)
}

pub fn get_active_medications_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, name, dose, route, scheduled_times, is_prn,
         status, prescribed_by, notes, started_at, stopped_at, stop_reason
         FROM medications WHERE patient_id = ?1 AND status = 'active'
         ORDER BY name ASC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok(medication_row_from_rusqlite(row))
    })?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row??)?);
    }
    Ok(meds)
}

/// Stop an active medication. Returns NotFound if the id is unknown.
pub fn mark_stopped(
    conn: &Connection,
    med_id: &Uuid,
    stopped_at: NaiveDateTime,
    reason: Option<&str>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medications SET status = 'stopped', stopped_at = ?2, stop_reason = ?3
         WHERE id = ?1",
        params![med_id.to_string(), stopped_at, reason],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medication".into(),
            id: med_id.to_string(),
        });
    }
    Ok(())
}

pub fn count_active_medications(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM medications WHERE patient_id = ?1 AND status = 'active'",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn encode_schedule(times: &[ScheduleTime]) -> Result<String, DatabaseError> {
    serde_json::to_string(times)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("scheduled_times: {e}")))
}

fn decode_schedule(raw: &str) -> Result<Vec<ScheduleTime>, DatabaseError> {
    serde_json::from_str(raw)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("scheduled_times: {e}")))
}

// Internal row type for Medication mapping
struct MedicationRow {
    id: String,
    patient_id: String,
    name: String,
    dose: String,
    route: String,
    scheduled_times: String,
    is_prn: i32,
    status: String,
    prescribed_by: String,
    notes: Option<String>,
    started_at: NaiveDateTime,
    stopped_at: Option<NaiveDateTime>,
    stop_reason: Option<String>,
}

fn medication_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<MedicationRow, rusqlite::Error> {
    Ok(MedicationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        name: row.get(2)?,
        dose: row.get(3)?,
        route: row.get(4)?,
        scheduled_times: row.get(5)?,
        is_prn: row.get(6)?,
        status: row.get(7)?,
        prescribed_by: row.get(8)?,
        notes: row.get(9)?,
        started_at: row.get(10)?,
        stopped_at: row.get(11)?,
        stop_reason: row.get(12)?,
    })
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, DatabaseError> {
    Ok(Medication {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: Uuid::parse_str(&row.patient_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        name: row.name,
        dose: row.dose,
        route: row.route,
        scheduled_times: decode_schedule(&row.scheduled_times)?,
        is_prn: row.is_prn != 0,
        status: MedicationStatus::from_str(&row.status)?,
        prescribed_by: row.prescribed_by,
        notes: row.notes,
        started_at: row.started_at,
        stopped_at: row.stopped_at,
        stop_reason: row.stop_reason,
    })
}

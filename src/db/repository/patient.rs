use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::PatientStatus;
use crate::models::Patient;

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, date_of_birth, sex, ward_number, bed_number,
         status, allergies, admitted_at, discharged_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            patient.id.to_string(),
            patient.name,
            patient.date_of_birth.map(|d| d.to_string()),
            patient.sex,
            patient.ward_number,
            patient.bed_number,
            patient.status.as_str(),
            patient.allergies,
            patient.admitted_at,
            patient.discharged_at,
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, patient_id: &Uuid) -> Result<Patient, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, date_of_birth, sex, ward_number, bed_number,
             status, allergies, admitted_at, discharged_at
             FROM patients WHERE id = ?1",
            params![patient_id.to_string()],
            |row| Ok(patient_row_from_rusqlite(row)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "patient".into(),
                id: patient_id.to_string(),
            },
            other => DatabaseError::from(other),
        })?;
    patient_from_row(row?)
}

pub fn get_admitted_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, date_of_birth, sex, ward_number, bed_number,
         status, allergies, admitted_at, discharged_at
         FROM patients WHERE status = 'admitted'
         ORDER BY ward_number ASC, bed_number ASC",
    )?;

    let rows = stmt.query_map([], |row| Ok(patient_row_from_rusqlite(row)))?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row??)?);
    }
    Ok(patients)
}

/// Mark a patient discharged. Returns NotFound if the id is unknown.
pub fn mark_discharged(
    conn: &Connection,
    patient_id: &Uuid,
    discharged_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET status = 'discharged', discharged_at = ?2 WHERE id = ?1",
        params![patient_id.to_string(), discharged_at],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient_id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    name: String,
    date_of_birth: Option<String>,
    sex: Option<String>,
    ward_number: String,
    bed_number: Option<String>,
    status: String,
    allergies: Option<String>,
    admitted_at: NaiveDateTime,
    discharged_at: Option<NaiveDateTime>,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        date_of_birth: row.get(2)?,
        sex: row.get(3)?,
        ward_number: row.get(4)?,
        bed_number: row.get(5)?,
        status: row.get(6)?,
        allergies: row.get(7)?,
        admitted_at: row.get(8)?,
        discharged_at: row.get(9)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        name: row.name,
        date_of_birth: row
            .date_of_birth
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        sex: row.sex,
        ward_number: row.ward_number,
        bed_number: row.bed_number,
        status: PatientStatus::from_str(&row.status)?,
        allergies: row.allergies,
        admitted_at: row.admitted_at,
        discharged_at: row.discharged_at,
    })
}

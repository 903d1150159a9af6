//! Patient roster — registration, discharge, and the ward directory.
//!
//! View types for the roster screen plus the query and mutation functions
//! behind it. Every mutation appends to the audit trail.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{count_active_medications, insert_audit_entry, insert_patient, mark_discharged};
use crate::db::DatabaseError;
use crate::models::enums::{AuditAction, PatientStatus};
use crate::models::Patient;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// New admission input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatientInput {
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub ward_number: String,
    pub bed_number: Option<String>,
    pub allergies: Option<String>,
}

/// A patient card for the directory view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientCard {
    pub id: Uuid,
    pub name: String,
    pub ward_number: String,
    pub bed_number: Option<String>,
    pub status: String,
    pub allergies: Option<String>,
    pub admitted_at: NaiveDateTime,
    pub active_medication_count: u32,
}

/// Filter parameters for the directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterFilter {
    pub status: Option<String>,
    pub ward_number: Option<String>,
    pub search_query: Option<String>,
}

/// Directory screen data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterData {
    pub patients: Vec<PatientCard>,
    pub total_admitted: u32,
    pub total_discharged: u32,
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Register a new admission and audit it.
pub fn register_patient(
    conn: &Connection,
    input: NewPatientInput,
    admitted_at: NaiveDateTime,
    actor: &str,
) -> Result<Patient, DatabaseError> {
    if input.name.trim().is_empty() {
        return Err(DatabaseError::ConstraintViolation(
            "patient name is required".into(),
        ));
    }
    if input.ward_number.trim().is_empty() {
        return Err(DatabaseError::ConstraintViolation(
            "ward number is required".into(),
        ));
    }

    let patient = Patient {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        date_of_birth: input.date_of_birth,
        sex: input.sex,
        ward_number: input.ward_number.trim().to_string(),
        bed_number: input.bed_number,
        status: PatientStatus::Admitted,
        allergies: input.allergies,
        admitted_at,
        discharged_at: None,
    };

    insert_patient(conn, &patient)?;
    insert_audit_entry(
        conn,
        actor,
        AuditAction::PatientRegistered,
        &format!("patient:{}", patient.id),
        Some(&patient.name),
    )?;
    tracing::info!(patient = %patient.id, ward = %patient.ward_number, "patient registered");

    Ok(patient)
}

/// Discharge an admitted patient and audit it.
pub fn discharge_patient(
    conn: &Connection,
    patient_id: &Uuid,
    discharged_at: NaiveDateTime,
    actor: &str,
) -> Result<(), DatabaseError> {
    let current: String = conn
        .query_row(
            "SELECT status FROM patients WHERE id = ?1",
            params![patient_id.to_string()],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "patient".into(),
                id: patient_id.to_string(),
            },
            other => DatabaseError::from(other),
        })?;
    if current == PatientStatus::Discharged.as_str() {
        return Err(DatabaseError::ConstraintViolation(
            "patient is already discharged".into(),
        ));
    }

    mark_discharged(conn, patient_id, discharged_at)?;
    insert_audit_entry(
        conn,
        actor,
        AuditAction::PatientDischarged,
        &format!("patient:{patient_id}"),
        None,
    )?;
    tracing::info!(patient = %patient_id, "patient discharged");

    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Fetch the directory with dynamic filters.
/// Sorted: admitted first, then by ward and bed.
pub fn fetch_roster(conn: &Connection, filter: &RosterFilter) -> Result<RosterData, DatabaseError> {
    let mut sql = String::from(
        "SELECT id, name, ward_number, bed_number, status, allergies, admitted_at
         FROM patients
         WHERE 1=1",
    );

    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    if let Some(status) = &filter.status {
        sql.push_str(&format!(" AND status = ?{param_idx}"));
        params_vec.push(Box::new(status.clone()));
        param_idx += 1;
    }

    if let Some(ward) = &filter.ward_number {
        sql.push_str(&format!(" AND ward_number = ?{param_idx}"));
        params_vec.push(Box::new(ward.clone()));
        param_idx += 1;
    }

    if let Some(query) = &filter.search_query {
        if !query.trim().is_empty() {
            let pattern = format!("%{}%", query.trim());
            sql.push_str(&format!(" AND name LIKE ?{param_idx} COLLATE NOCASE"));
            params_vec.push(Box::new(pattern));
        }
    }

    sql.push_str(
        " ORDER BY CASE status WHEN 'admitted' THEN 1 WHEN 'discharged' THEN 2 END ASC,
          ward_number ASC, bed_number ASC",
    );

    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, NaiveDateTime>(6)?,
        ))
    })?;

    let mut patients = Vec::new();
    for row in rows {
        let (id, name, ward_number, bed_number, status, allergies, admitted_at) = row?;
        let id = Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
        patients.push(PatientCard {
            id,
            name,
            ward_number,
            bed_number,
            status,
            allergies,
            admitted_at,
            active_medication_count: count_active_medications(conn, &id)?,
        });
    }

    let (total_admitted, total_discharged) = fetch_status_counts(conn)?;

    Ok(RosterData {
        patients,
        total_admitted,
        total_discharged,
    })
}

/// Patient counts by status for the directory header.
fn fetch_status_counts(conn: &Connection) -> Result<(u32, u32), DatabaseError> {
    let admitted: u32 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE status = 'admitted'",
        [],
        |row| row.get(0),
    )?;
    let discharged: u32 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE status = 'discharged'",
        [],
        |row| row.get(0),
    )?;
    Ok((admitted, discharged))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

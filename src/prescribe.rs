//! Prescribing — pharmacist entry and withdrawal of ward prescriptions.
//!
//! Schedule strings are validated here, at the write boundary: a malformed
//! HH:MM entry is a data-integrity error surfaced immediately, never stored.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{
    get_medication, get_medications_for_patient, get_patient, insert_audit_entry,
    insert_medication, mark_stopped,
};
use crate::db::DatabaseError;
use crate::models::enums::{AuditAction, MedicationStatus, PatientStatus};
use crate::models::Medication;
use crate::schedule::parse_times;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// New prescription input. `scheduled_times` are raw `"HH:MM"` strings;
/// an empty list means PRN / as-needed.
#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionInput {
    pub patient_id: Uuid,
    pub name: String,
    pub dose: String,
    pub route: String,
    pub scheduled_times: Vec<String>,
    pub notes: Option<String>,
}

/// A prescription entry for the patient chart view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionView {
    pub id: Uuid,
    pub name: String,
    pub dose: String,
    pub route: String,
    pub scheduled_times: Vec<String>,
    pub is_prn: bool,
    pub status: String,
    pub prescribed_by: String,
    pub started_at: NaiveDateTime,
    pub stopped_at: Option<NaiveDateTime>,
    pub stop_reason: Option<String>,
}

impl From<Medication> for PrescriptionView {
    fn from(med: Medication) -> Self {
        Self {
            id: med.id,
            name: med.name,
            dose: med.dose,
            route: med.route,
            scheduled_times: med
                .scheduled_times
                .iter()
                .map(|t| t.to_string())
                .collect(),
            is_prn: med.is_prn,
            status: med.status.as_str().to_string(),
            prescribed_by: med.prescribed_by,
            started_at: med.started_at,
            stopped_at: med.stopped_at,
            stop_reason: med.stop_reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Create a prescription for an admitted patient and audit it.
pub fn create_prescription(
    conn: &Connection,
    input: PrescriptionInput,
    started_at: NaiveDateTime,
    prescriber: &str,
) -> Result<Medication, DatabaseError> {
    if input.name.trim().is_empty() {
        return Err(DatabaseError::ConstraintViolation(
            "medication name is required".into(),
        ));
    }

    let patient = get_patient(conn, &input.patient_id)?;
    if patient.status != PatientStatus::Admitted {
        return Err(DatabaseError::ConstraintViolation(
            "cannot prescribe for a discharged patient".into(),
        ));
    }

    let scheduled_times = parse_times(&input.scheduled_times)?;
    let is_prn = scheduled_times.is_empty();

    let medication = Medication {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        name: input.name.trim().to_string(),
        dose: input.dose,
        route: input.route,
        scheduled_times,
        is_prn,
        status: MedicationStatus::Active,
        prescribed_by: prescriber.to_string(),
        notes: input.notes,
        started_at,
        stopped_at: None,
        stop_reason: None,
    };

    insert_medication(conn, &medication)?;
    insert_audit_entry(
        conn,
        prescriber,
        AuditAction::MedicationPrescribed,
        &format!("medication:{}", medication.id),
        Some(&format!("{} {} for {}", medication.name, medication.dose, patient.name)),
    )?;
    tracing::info!(
        medication = %medication.id,
        patient = %patient.id,
        prn = is_prn,
        "prescription created"
    );

    Ok(medication)
}

/// Stop an active prescription with a reason and audit it.
pub fn stop_prescription(
    conn: &Connection,
    med_id: &Uuid,
    stopped_at: NaiveDateTime,
    reason: Option<&str>,
    actor: &str,
) -> Result<(), DatabaseError> {
    let medication = get_medication(conn, med_id)?;
    if medication.status != MedicationStatus::Active {
        return Err(DatabaseError::ConstraintViolation(
            "medication is already stopped".into(),
        ));
    }

    mark_stopped(conn, med_id, stopped_at, reason)?;
    insert_audit_entry(
        conn,
        actor,
        AuditAction::MedicationStopped,
        &format!("medication:{med_id}"),
        reason,
    )?;
    tracing::info!(medication = %med_id, "prescription stopped");

    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A patient's chart: active prescriptions first, newest first within group.
pub fn patient_chart(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PrescriptionView>, DatabaseError> {
    let meds = get_medications_for_patient(conn, patient_id)?;
    Ok(meds.into_iter().map(PrescriptionView::from).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

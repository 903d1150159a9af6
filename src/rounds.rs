//! Medication rounds — the nurse dashboard.
//!
//! Builds per-medication cards by combining each stored schedule with
//! today's administration history through [`crate::schedule::evaluate`],
//! and records administration events. The evaluation instant is always an
//! explicit parameter; callers own the refresh cadence.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{
    get_active_medications_for_patient, get_administrations_for_medication,
    get_admitted_patients, get_medication, insert_administration, insert_audit_entry,
    last_administered,
};
use crate::db::DatabaseError;
use crate::models::enums::{AdministrationStatus, AuditAction, MedicationStatus};
use crate::models::AdministrationEvent;
use crate::schedule::{self, DoseEvaluation};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One medication card on the rounds screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationRound {
    pub medication_id: Uuid,
    pub name: String,
    pub dose: String,
    pub route: String,
    pub scheduled_times: Vec<String>,
    pub is_prn: bool,
    pub evaluation: DoseEvaluation,
    pub last_given_at: Option<NaiveDateTime>,
    pub last_given_by: Option<String>,
}

/// All rounds cards for one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRounds {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub ward_number: String,
    pub bed_number: Option<String>,
    pub allergies: Option<String>,
    pub medications: Vec<MedicationRound>,
    pub due_count: u32,
}

/// Rounds screen data — single fetch for the whole ward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardRounds {
    pub evaluated_at: NaiveDateTime,
    pub patients: Vec<PatientRounds>,
    pub total_due: u32,
}

/// Administration entry input from the confirm dialog.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordAdministrationInput {
    pub medication_id: Uuid,
    pub status: AdministrationStatus,
    pub notes: Option<String>,
}

/// Today's administration counts for the shift-handover footer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaySummary {
    pub administered: u32,
    pub missed: u32,
    pub refused: u32,
    pub held: u32,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Rounds for every admitted patient, evaluated at `now`.
pub fn fetch_ward_rounds(
    conn: &Connection,
    now: NaiveDateTime,
) -> Result<WardRounds, DatabaseError> {
    let mut patients = Vec::new();
    let mut total_due = 0;

    for patient in get_admitted_patients(conn)? {
        let rounds = build_patient_rounds(conn, &patient, now)?;
        total_due += rounds.due_count;
        patients.push(rounds);
    }

    Ok(WardRounds {
        evaluated_at: now,
        patients,
        total_due,
    })
}

/// Rounds for a single patient, evaluated at `now`.
pub fn fetch_patient_rounds(
    conn: &Connection,
    patient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<PatientRounds, DatabaseError> {
    let patient = crate::db::repository::get_patient(conn, patient_id)?;
    build_patient_rounds(conn, &patient, now)
}

fn build_patient_rounds(
    conn: &Connection,
    patient: &crate::models::Patient,
    now: NaiveDateTime,
) -> Result<PatientRounds, DatabaseError> {
    let mut medications = Vec::new();
    let mut due_count = 0;

    for med in get_active_medications_for_patient(conn, &patient.id)? {
        let history = get_administrations_for_medication(conn, &med.id)?;
        let evaluation = schedule::evaluate(&med.scheduled_times, &history, now);
        if evaluation.allowed {
            due_count += 1;
        }

        let last = last_administered(conn, &med.id)?;
        medications.push(MedicationRound {
            medication_id: med.id,
            name: med.name,
            dose: med.dose,
            route: med.route,
            scheduled_times: med.scheduled_times.iter().map(|t| t.to_string()).collect(),
            is_prn: med.is_prn,
            evaluation,
            last_given_at: last.as_ref().map(|(at, _)| *at),
            last_given_by: last.map(|(_, by)| by),
        });
    }

    Ok(PatientRounds {
        patient_id: patient.id,
        patient_name: patient.name.clone(),
        ward_number: patient.ward_number.clone(),
        bed_number: patient.bed_number.clone(),
        allergies: patient.allergies.clone(),
        medications,
        due_count,
    })
}

/// Today's counts by administration outcome.
pub fn day_summary(conn: &Connection, now: NaiveDateTime) -> Result<DaySummary, DatabaseError> {
    let mut summary = DaySummary::default();
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM administrations
         WHERE date(given_at) = date(?1)
         GROUP BY status",
    )?;
    let rows = stmt.query_map(params![now], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
    })?;

    for row in rows {
        let (status, count) = row?;
        match status.as_str() {
            "administered" => summary.administered = count,
            "missed" => summary.missed = count,
            "refused" => summary.refused = count,
            "held" => summary.held = count,
            _ => {}
        }
    }
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Record an administration outcome against an active medication and audit
/// it. The dose-window evaluation is advisory; the confirm dialog may record
/// any outcome, and the next evaluation will reflect it.
pub fn record_administration(
    conn: &Connection,
    input: RecordAdministrationInput,
    given_at: NaiveDateTime,
    nurse: &str,
) -> Result<AdministrationEvent, DatabaseError> {
    let medication = get_medication(conn, &input.medication_id)?;
    if medication.status != MedicationStatus::Active {
        return Err(DatabaseError::ConstraintViolation(
            "cannot record against a stopped medication".into(),
        ));
    }

    let event = AdministrationEvent {
        id: Uuid::new_v4(),
        medication_id: medication.id,
        status: input.status,
        given_at,
        given_by: nurse.to_string(),
        notes: input.notes,
    };

    insert_administration(conn, &event)?;
    insert_audit_entry(
        conn,
        nurse,
        AuditAction::AdministrationRecorded,
        &format!("medication:{}", medication.id),
        Some(&format!("{} {}", medication.name, event.status.as_str())),
    )?;
    tracing::info!(
        medication = %medication.id,
        status = event.status.as_str(),
        "administration recorded"
    );

    Ok(event)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::prescribe::{create_prescription, stop_prescription, PrescriptionInput};
    use crate::roster::{register_patient, NewPatientInput};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn admit(conn: &Connection, name: &str) -> Uuid {
        register_patient(
            conn,
            NewPatientInput {
                name: name.into(),
                date_of_birth: None,
                sex: None,
                ward_number: "3B".into(),
                bed_number: Some("12".into()),
                allergies: None,
            },
            at("2025-03-10 08:00"),
            "ward-clerk",
        )
        .unwrap()
        .id
    }

    fn prescribe(conn: &Connection, patient_id: Uuid, name: &str, times: &[&str]) -> Uuid {
        create_prescription(
            conn,
            PrescriptionInput {
                patient_id,
                name: name.into(),
                dose: "500mg".into(),
                route: "oral".into(),
                scheduled_times: times.iter().map(|s| s.to_string()).collect(),
                notes: None,
            },
            at("2025-03-10 08:30"),
            "pharm.osei",
        )
        .unwrap()
        .id
    }

    fn record(conn: &Connection, med_id: Uuid, status: AdministrationStatus, when: &str) {
        record_administration(
            conn,
            RecordAdministrationInput {
                medication_id: med_id,
                status,
                notes: None,
            },
            at(when),
            "nurse.okafor",
        )
        .unwrap();
    }

    #[test]
    fn due_medication_shows_allowed_card() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        prescribe(&conn, patient_id, "Amoxicillin", &["08:00", "20:00"]);

        let rounds = fetch_ward_rounds(&conn, at("2025-03-11 08:10")).unwrap();
        assert_eq!(rounds.total_due, 1);
        let card = &rounds.patients[0].medications[0];
        assert!(card.evaluation.allowed);
        assert_eq!(
            card.evaluation.matched_time.map(|t| t.to_string()),
            Some("08:00".to_string())
        );
    }

    #[test]
    fn not_due_medication_reports_next_slot() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        prescribe(&conn, patient_id, "Amoxicillin", &["08:00", "20:00"]);

        let rounds = fetch_patient_rounds(&conn, &patient_id, at("2025-03-11 10:00")).unwrap();
        let card = &rounds.medications[0];
        assert!(!card.evaluation.allowed);
        assert_eq!(
            card.evaluation.next_time.map(|t| t.to_string()),
            Some("20:00".to_string())
        );
        assert!(card.evaluation.reason.contains("10h 0m"));
        assert_eq!(rounds.due_count, 0);
    }

    #[test]
    fn prn_medication_is_always_due() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        prescribe(&conn, patient_id, "Paracetamol", &[]);

        let rounds = fetch_patient_rounds(&conn, &patient_id, at("2025-03-11 03:00")).unwrap();
        let card = &rounds.medications[0];
        assert!(card.is_prn);
        assert!(card.evaluation.allowed);
        assert_eq!(card.evaluation.reason, "No fixed schedule");
    }

    #[test]
    fn recording_a_dose_closes_the_window() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        let med_id = prescribe(&conn, patient_id, "Amoxicillin", &["08:00", "20:00"]);

        record(&conn, med_id, AdministrationStatus::Administered, "2025-03-11 08:05");

        let rounds = fetch_patient_rounds(&conn, &patient_id, at("2025-03-11 08:10")).unwrap();
        let card = &rounds.medications[0];
        assert!(!card.evaluation.allowed, "08:00 slot must now be satisfied");
        assert_eq!(
            card.evaluation.next_time.map(|t| t.to_string()),
            Some("20:00".to_string())
        );
        assert_eq!(card.last_given_at, Some(at("2025-03-11 08:05")));
        assert_eq!(card.last_given_by.as_deref(), Some("nurse.okafor"));
    }

    #[test]
    fn missed_dose_leaves_window_open() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        let med_id = prescribe(&conn, patient_id, "Amoxicillin", &["08:00"]);

        record(&conn, med_id, AdministrationStatus::Missed, "2025-03-11 08:05");

        let rounds = fetch_patient_rounds(&conn, &patient_id, at("2025-03-11 08:10")).unwrap();
        let card = &rounds.medications[0];
        assert!(card.evaluation.allowed);
        assert!(card.last_given_at.is_none(), "missed is not an administration");
    }

    #[test]
    fn stopped_medication_is_excluded_from_rounds() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        let med_id = prescribe(&conn, patient_id, "Amoxicillin", &["08:00"]);
        stop_prescription(&conn, &med_id, at("2025-03-10 18:00"), None, "pharm.osei").unwrap();

        let rounds = fetch_patient_rounds(&conn, &patient_id, at("2025-03-11 08:00")).unwrap();
        assert!(rounds.medications.is_empty());
    }

    #[test]
    fn recording_against_stopped_medication_is_rejected() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        let med_id = prescribe(&conn, patient_id, "Amoxicillin", &["08:00"]);
        stop_prescription(&conn, &med_id, at("2025-03-10 18:00"), None, "pharm.osei").unwrap();

        let result = record_administration(
            &conn,
            RecordAdministrationInput {
                medication_id: med_id,
                status: AdministrationStatus::Administered,
                notes: None,
            },
            at("2025-03-11 08:00"),
            "nurse.okafor",
        );
        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
    }

    #[test]
    fn ward_rounds_cover_only_admitted_patients() {
        let conn = open_memory_database().unwrap();
        let staying = admit(&conn, "Ama Mensah");
        prescribe(&conn, staying, "Amoxicillin", &["08:00"]);
        let leaving = admit(&conn, "Kofi Boateng");
        prescribe(&conn, leaving, "Cefalexin", &["08:00"]);
        crate::roster::discharge_patient(&conn, &leaving, at("2025-03-10 20:00"), "ward-clerk")
            .unwrap();

        let rounds = fetch_ward_rounds(&conn, at("2025-03-11 08:00")).unwrap();
        assert_eq!(rounds.patients.len(), 1);
        assert_eq!(rounds.patients[0].patient_name, "Ama Mensah");
    }

    #[test]
    fn day_summary_counts_by_outcome() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        let a = prescribe(&conn, patient_id, "Amoxicillin", &["08:00", "20:00"]);
        let b = prescribe(&conn, patient_id, "Cefalexin", &["09:00"]);

        record(&conn, a, AdministrationStatus::Administered, "2025-03-11 08:05");
        record(&conn, a, AdministrationStatus::Administered, "2025-03-11 20:10");
        record(&conn, b, AdministrationStatus::Refused, "2025-03-11 09:00");
        // Previous day must not count
        record(&conn, b, AdministrationStatus::Missed, "2025-03-10 09:00");

        let summary = day_summary(&conn, at("2025-03-11 22:00")).unwrap();
        assert_eq!(summary.administered, 2);
        assert_eq!(summary.refused, 1);
        assert_eq!(summary.missed, 0);
        assert_eq!(summary.held, 0);
    }

    #[test]
    fn administrations_are_audited() {
        let conn = open_memory_database().unwrap();
        let patient_id = admit(&conn, "Ama Mensah");
        let med_id = prescribe(&conn, patient_id, "Amoxicillin", &["08:00"]);
        record(&conn, med_id, AdministrationStatus::Administered, "2025-03-11 08:05");

        let detail: String = conn
            .query_row(
                "SELECT detail FROM audit_log WHERE action = 'administration_recorded'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(detail, "Amoxicillin administered");
    }
}

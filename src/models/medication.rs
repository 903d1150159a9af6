use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AdministrationStatus, MedicationStatus};
use crate::schedule::ScheduleTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub dose: String,
    pub route: String,
    /// Times of day a dose is due; empty for PRN / as-needed drugs.
    pub scheduled_times: Vec<ScheduleTime>,
    pub is_prn: bool,
    pub status: MedicationStatus,
    pub prescribed_by: String,
    pub notes: Option<String>,
    pub started_at: NaiveDateTime,
    pub stopped_at: Option<NaiveDateTime>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdministrationEvent {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub status: AdministrationStatus,
    pub given_at: NaiveDateTime,
    pub given_by: String,
    pub notes: Option<String>,
}

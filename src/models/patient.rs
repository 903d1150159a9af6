use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PatientStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub ward_number: String,
    pub bed_number: Option<String>,
    pub status: PatientStatus,
    pub allergies: Option<String>,
    pub admitted_at: NaiveDateTime,
    pub discharged_at: Option<NaiveDateTime>,
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::AuditAction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub actor: String,
    pub action: AuditAction,
    pub entity: String,
    pub detail: Option<String>,
}

//! Audit trail views — recent ward activity and retention pruning.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::db::repository::{prune_audit_log, query_recent_audit};
use crate::db::DatabaseError;
use crate::models::enums::AuditAction;

/// A formatted audit entry for the activity screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntryView {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub detail: Option<String>,
}

/// Recent ward activity, newest first.
pub fn recent_activity(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<AuditEntryView>, DatabaseError> {
    let entries = query_recent_audit(conn, limit)?;
    Ok(entries
        .into_iter()
        .map(|e| AuditEntryView {
            id: e.id,
            timestamp: e.timestamp,
            actor: e.actor,
            action: format_action(e.action),
            entity: e.entity,
            detail: e.detail,
        })
        .collect())
}

/// Remove audit entries past the retention period. Returns the number pruned.
pub fn prune_expired(conn: &Connection) -> Result<usize, DatabaseError> {
    let pruned = prune_audit_log(conn, config::AUDIT_RETENTION_DAYS)?;
    if pruned > 0 {
        tracing::info!(pruned, "audit log pruned");
    }
    Ok(pruned)
}

/// Format an audit action for display.
fn format_action(action: AuditAction) -> String {
    match action {
        AuditAction::PatientRegistered => "Patient registered".to_string(),
        AuditAction::PatientDischarged => "Patient discharged".to_string(),
        AuditAction::MedicationPrescribed => "Medication prescribed".to_string(),
        AuditAction::MedicationStopped => "Medication stopped".to_string(),
        AuditAction::AdministrationRecorded => "Administration recorded".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_audit_entry;
    use crate::db::sqlite::open_memory_database;
    use rusqlite::params;

    #[test]
    fn recent_activity_is_newest_first() {
        let conn = open_memory_database().unwrap();
        insert_audit_entry(&conn, "clerk", AuditAction::PatientRegistered, "patient:1", None)
            .unwrap();
        insert_audit_entry(&conn, "pharm", AuditAction::MedicationPrescribed, "medication:2", None)
            .unwrap();

        let entries = recent_activity(&conn, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "Medication prescribed");
        assert_eq!(entries[1].action, "Patient registered");
    }

    #[test]
    fn recent_activity_respects_limit() {
        let conn = open_memory_database().unwrap();
        for i in 0..5 {
            insert_audit_entry(
                &conn,
                "clerk",
                AuditAction::PatientRegistered,
                &format!("patient:{i}"),
                None,
            )
            .unwrap();
        }
        let entries = recent_activity(&conn, 3).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn prune_removes_only_expired_entries() {
        let conn = open_memory_database().unwrap();
        insert_audit_entry(&conn, "clerk", AuditAction::PatientRegistered, "patient:1", None)
            .unwrap();
        // Entry well past the retention period
        conn.execute(
            "INSERT INTO audit_log (timestamp, actor, action, entity)
             VALUES (datetime('now', ?1), 'clerk', 'patient_discharged', 'patient:0')",
            params![format!("-{} days", config::AUDIT_RETENTION_DAYS + 30)],
        )
        .unwrap();

        let pruned = prune_expired(&conn).unwrap();
        assert_eq!(pruned, 1);

        let remaining = recent_activity(&conn, 10).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].entity, "patient:1");
    }

    #[test]
    fn prune_on_fresh_log_is_noop() {
        let conn = open_memory_database().unwrap();
        insert_audit_entry(&conn, "clerk", AuditAction::PatientRegistered, "patient:1", None)
            .unwrap();
        assert_eq!(prune_expired(&conn).unwrap(), 0);
    }
}

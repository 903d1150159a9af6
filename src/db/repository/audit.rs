use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::AuditAction;
use crate::models::AuditEntry;

/// Append one audit entry. Timestamps are written in SQLite's own
/// datetime format so retention pruning can compare against datetime('now').
pub fn insert_audit_entry(
    conn: &Connection,
    actor: &str,
    action: AuditAction,
    entity: &str,
    detail: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, actor, action, entity, detail)
         VALUES (datetime('now'), ?1, ?2, ?3, ?4)",
        params![actor, action.as_str(), entity, detail],
    )?;
    Ok(())
}

/// Most recent audit entries first, up to `limit`.
pub fn query_recent_audit(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, actor, action, entity, detail
         FROM audit_log ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, NaiveDateTime>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, timestamp, actor, action, entity, detail) = row?;
        entries.push(AuditEntry {
            id,
            timestamp,
            actor,
            action: AuditAction::from_str(&action)?,
            entity,
            detail,
        });
    }
    Ok(entries)
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < datetime('now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{AuditEntry, NewAuditEntry, OrderId};

/// Appends a note to the audit log. Entries are never updated or removed.
pub async fn append(id: &OrderId, entry: NewAuditEntry, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    trace!("📝️ Audit [{id}] {}: {}", entry.actor, entry.note);
    sqlx::query("INSERT INTO order_audit_log (order_id, created_at, actor, note) VALUES ($1, $2, $3, $4)")
        .bind(id.as_str())
        .bind(entry.created_at)
        .bind(entry.actor)
        .bind(entry.note)
        .execute(conn)
        .await?;
    Ok(())
}

/// All audit entries for the order, oldest first.
pub async fn fetch_for_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<AuditEntry>, sqlx::Error> {
    let entries = sqlx::query_as(
        "SELECT order_id, created_at, actor, note FROM order_audit_log WHERE order_id = $1 ORDER BY id ASC",
    )
    .bind(id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

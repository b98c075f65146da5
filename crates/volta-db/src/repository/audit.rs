//! # Audit Repository
//!
//! The activity log and the financial guard log. Both are append-only;
//! nothing here ever updates or deletes a row.
//!
//! Activity entries are written by the mutation they describe, inside the
//! same transaction, so the log can never show an action whose transaction
//! rolled back.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::warn;

use crate::error::DbResult;
use volta_core::{ActivityLogEntry, FinancialGuardLogEntry};

const ACTIVITY_COLUMNS: &str =
    "id, actor, ip_address, action, entity, entity_id, details, created_at";

/// Repository for audit trail operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends an activity entry inside the caller's transaction.
    pub async fn log_in_tx(
        conn: &mut SqliteConnection,
        entry: &ActivityLogEntry,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (
                id, actor, ip_address, action, entity, entity_id, details, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.actor)
        .bind(&entry.ip_address)
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(&entry.entity_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Recent activity for one entity, newest first.
    pub async fn history_for(
        &self,
        entity: &str,
        entity_id: &str,
        limit: i64,
    ) -> DbResult<Vec<ActivityLogEntry>> {
        let query = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity_log \
             WHERE entity = ?1 AND entity_id = ?2 \
             ORDER BY created_at DESC LIMIT ?3"
        );
        let entries = sqlx::query_as::<_, ActivityLogEntry>(&query)
            .bind(entity)
            .bind(entity_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Recent activity across all entities, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<ActivityLogEntry>> {
        let query = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity_log ORDER BY created_at DESC LIMIT ?1"
        );
        let entries = sqlx::query_as::<_, ActivityLogEntry>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Records an attempt to derive financial figures from operational data.
    ///
    /// Pool-backed on purpose: the violation record must survive even if the
    /// offending transaction rolls back.
    pub async fn log_financial_guard(&self, entry: &FinancialGuardLogEntry) -> DbResult<()> {
        warn!(
            source = %entry.source,
            action = %entry.attempted_action,
            "Financial isolation guard triggered"
        );

        sqlx::query(
            r#"
            INSERT INTO financial_guard_log (
                id, source, attempted_action, details, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.source)
        .bind(&entry.attempted_action)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists financial guard entries, newest first.
    pub async fn financial_guard_entries(
        &self,
        limit: i64,
    ) -> DbResult<Vec<FinancialGuardLogEntry>> {
        let entries = sqlx::query_as::<_, FinancialGuardLogEntry>(
            r#"
            SELECT id, source, attempted_action, details, created_at
            FROM financial_guard_log
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use uuid::Uuid;

    fn activity(action: &str, entity_id: &str) -> ActivityLogEntry {
        ActivityLogEntry {
            id: Uuid::new_v4().to_string(),
            actor: "admin".into(),
            ip_address: Some("10.0.0.5".into()),
            action: action.into(),
            entity: "order".into(),
            entity_id: Some(entity_id.into()),
            details: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_activity_history() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        AuditRepository::log_in_tx(tx.as_mut(), &activity("order.confirm", "o-1"))
            .await
            .unwrap();
        AuditRepository::log_in_tx(tx.as_mut(), &activity("order.dispatch", "o-1"))
            .await
            .unwrap();
        AuditRepository::log_in_tx(tx.as_mut(), &activity("order.confirm", "o-2"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let history = db.audit().history_for("order", "o-1", 10).await.unwrap();
        assert_eq!(history.len(), 2);

        let recent = db.audit().recent(10).await.unwrap();
        assert_eq!(recent.len(), 3);
    }

    #[tokio::test]
    async fn test_rolled_back_activity_never_appears() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        AuditRepository::log_in_tx(tx.as_mut(), &activity("order.confirm", "o-9"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(db.audit().history_for("order", "o-9", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_financial_guard_log() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let entry = FinancialGuardLogEntry {
            id: Uuid::new_v4().to_string(),
            source: "reporting".into(),
            attempted_action: "read:orders.final_price".into(),
            details: Some("blocked".into()),
            created_at: Utc::now(),
        };
        db.audit().log_financial_guard(&entry).await.unwrap();

        let entries = db.audit().financial_guard_entries(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, "reporting");
    }
}

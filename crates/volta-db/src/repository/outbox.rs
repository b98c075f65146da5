//! # Notification Outbox Repository
//!
//! The transactional notification queue.
//!
//! ## Why An Outbox
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order confirm transaction:                                             │
//! │    UPDATE orders ...            ┐                                       │
//! │    INSERT notification_outbox   ├── one COMMIT                          │
//! │    INSERT activity_log          ┘                                       │
//! │                                                                         │
//! │  COMMIT succeeds → notification is durably queued                      │
//! │  COMMIT fails    → no phantom notification for a change that           │
//! │                    never happened                                      │
//! │                                                                         │
//! │  A background dispatcher drains pending rows oldest-first. Delivery    │
//! │  failures mark the row and retry later - they can never bounce the    │
//! │  order transition that queued them.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use volta_core::{NotificationOutboxEntry, NotificationStatus};

const OUTBOX_COLUMNS: &str = "id, event_type, recipient, payload, status, attempts, \
     last_error, created_at, attempted_at, sent_at";

/// Repository for the notification outbox.
#[derive(Debug, Clone)]
pub struct NotificationOutboxRepository {
    pool: SqlitePool,
}

impl NotificationOutboxRepository {
    /// Creates a new NotificationOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationOutboxRepository { pool }
    }

    /// Queues a notification inside the caller's transaction.
    pub async fn enqueue_in_tx(
        conn: &mut SqliteConnection,
        entry: &NotificationOutboxEntry,
    ) -> DbResult<()> {
        debug!(event = ?entry.event_type, recipient = %entry.recipient, "Queueing notification");

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (
                id, event_type, recipient, payload, status, attempts,
                last_error, created_at, attempted_at, sent_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.event_type)
        .bind(&entry.recipient)
        .bind(&entry.payload)
        .bind(entry.status)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.sent_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Fetches pending entries oldest-first, skipping rows that have
    /// exhausted their attempts.
    pub async fn get_pending(
        &self,
        limit: i64,
        max_attempts: i64,
    ) -> DbResult<Vec<NotificationOutboxEntry>> {
        let query = format!(
            "SELECT {OUTBOX_COLUMNS} FROM notification_outbox \
             WHERE status = ?1 AND attempts < ?2 \
             ORDER BY created_at LIMIT ?3"
        );
        let entries = sqlx::query_as::<_, NotificationOutboxEntry>(&query)
            .bind(NotificationStatus::Pending)
            .bind(max_attempts)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Marks an entry successfully dispatched.
    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE notification_outbox SET
                status = ?2, attempts = attempts + 1,
                attempted_at = ?3, sent_at = ?3, last_error = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(NotificationStatus::Sent)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NotificationOutboxEntry", id));
        }

        Ok(())
    }

    /// Records a failed dispatch attempt.
    ///
    /// The row stays pending (retried on the next dispatcher pass) until it
    /// runs out of attempts, then flips to failed for operator review.
    pub async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        max_attempts: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3,
                status = CASE WHEN attempts + 1 >= ?4 THEN ?5 ELSE status END
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .bind(max_attempts)
        .bind(NotificationStatus::Failed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NotificationOutboxEntry", id));
        }

        Ok(())
    }

    /// Counts undispatched entries (for diagnostics).
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification_outbox WHERE status = ?1",
        )
        .bind(NotificationStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Gets an entry by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<NotificationOutboxEntry>> {
        let query = format!("SELECT {OUTBOX_COLUMNS} FROM notification_outbox WHERE id = ?1");
        let entry = sqlx::query_as::<_, NotificationOutboxEntry>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    /// Deletes sent entries older than the given number of days.
    /// Returns the number of rows removed.
    pub async fn cleanup_sent(&self, older_than_days: i64) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM notification_outbox
            WHERE status = ?1
              AND sent_at < datetime('now', '-' || ?2 || ' days')
            "#,
        )
        .bind(NotificationStatus::Sent)
        .bind(older_than_days)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

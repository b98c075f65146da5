//! # Offline Receipt Repository
//!
//! Walk-in counter receipts, numbered `SS/YY/NNNN` on a sequence wholly
//! independent of online orders. Same MAX+1 allocation contract as
//! [`super::order::OrderRepository`], backstopped by
//! UNIQUE(financial_year, sequence_number).
//!
//! Lifecycle writes are guarded: voiding and correcting both require the
//! receipt to still be `active`, so a receipt can be voided at most once
//! and corrected at most once, and never both.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use volta_core::{OfflineReceipt, OfflineReceiptStatus};

const RECEIPT_COLUMNS: &str = "id, receipt_number, financial_year, sequence_number, \
     customer_name, status, subtotal_paise, tax_amount_paise, discount_amount_paise, \
     grand_total_paise, original_receipt_id, corrected_by_receipt_id, void_reason, \
     created_at, updated_at";

/// Repository for walk-in counter receipts.
#[derive(Debug, Clone)]
pub struct OfflineReceiptRepository {
    pool: SqlitePool,
}

impl OfflineReceiptRepository {
    /// Creates a new OfflineReceiptRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OfflineReceiptRepository { pool }
    }

    /// Gets a receipt by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<OfflineReceipt>> {
        let query = format!("SELECT {RECEIPT_COLUMNS} FROM offline_receipts WHERE id = ?1");
        let receipt = sqlx::query_as::<_, OfflineReceipt>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(receipt)
    }

    /// Gets a receipt by its human-facing number.
    pub async fn get_by_number(&self, receipt_number: &str) -> DbResult<Option<OfflineReceipt>> {
        let query =
            format!("SELECT {RECEIPT_COLUMNS} FROM offline_receipts WHERE receipt_number = ?1");
        let receipt = sqlx::query_as::<_, OfflineReceipt>(&query)
            .bind(receipt_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(receipt)
    }

    /// Lists receipts for a financial year, sequence order.
    pub async fn list_by_year(&self, financial_year: &str) -> DbResult<Vec<OfflineReceipt>> {
        let query = format!(
            "SELECT {RECEIPT_COLUMNS} FROM offline_receipts WHERE financial_year = ?1 \
             ORDER BY sequence_number"
        );
        let receipts = sqlx::query_as::<_, OfflineReceipt>(&query)
            .bind(financial_year)
            .fetch_all(&self.pool)
            .await?;

        Ok(receipts)
    }

    /// All sequence numbers committed for a financial year, ascending.
    pub async fn sequences(&self, financial_year: &str) -> DbResult<Vec<i64>> {
        let sequences: Vec<i64> = sqlx::query_scalar(
            "SELECT sequence_number FROM offline_receipts WHERE financial_year = ?1 \
             ORDER BY sequence_number",
        )
        .bind(financial_year)
        .fetch_all(&self.pool)
        .await?;

        Ok(sequences)
    }

    // =========================================================================
    // Transactional helpers
    // =========================================================================

    /// Next sequence for a financial year: `MAX + 1` over committed rows.
    /// Must run inside the transaction that inserts the receipt.
    pub async fn next_sequence(
        conn: &mut SqliteConnection,
        financial_year: &str,
    ) -> DbResult<i64> {
        let next: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(sequence_number), 0) + 1
            FROM offline_receipts
            WHERE financial_year = ?1
            "#,
        )
        .bind(financial_year)
        .fetch_one(&mut *conn)
        .await?;

        Ok(next)
    }

    /// Inserts a receipt inside an open transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - lost the sequence race; the caller
    ///   retries the whole transaction once
    pub async fn insert_in_tx(
        conn: &mut SqliteConnection,
        receipt: &OfflineReceipt,
    ) -> DbResult<()> {
        debug!(receipt = %receipt.receipt_number, "Inserting offline receipt");

        sqlx::query(
            r#"
            INSERT INTO offline_receipts (
                id, receipt_number, financial_year, sequence_number,
                customer_name, status, subtotal_paise, tax_amount_paise,
                discount_amount_paise, grand_total_paise, original_receipt_id,
                corrected_by_receipt_id, void_reason, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&receipt.id)
        .bind(&receipt.receipt_number)
        .bind(&receipt.financial_year)
        .bind(receipt.sequence_number)
        .bind(&receipt.customer_name)
        .bind(receipt.status)
        .bind(receipt.subtotal_paise)
        .bind(receipt.tax_amount_paise)
        .bind(receipt.discount_amount_paise)
        .bind(receipt.grand_total_paise)
        .bind(&receipt.original_receipt_id)
        .bind(&receipt.corrected_by_receipt_id)
        .bind(&receipt.void_reason)
        .bind(receipt.created_at)
        .bind(receipt.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Fetches a receipt inside an open transaction.
    pub async fn fetch_for_update(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<OfflineReceipt> {
        let query = format!("SELECT {RECEIPT_COLUMNS} FROM offline_receipts WHERE id = ?1");
        let receipt = sqlx::query_as::<_, OfflineReceipt>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("OfflineReceipt", id))?;

        Ok(receipt)
    }

    /// Voids a receipt (guarded: must still be active).
    ///
    /// ## Returns
    /// * `Ok(true)` - receipt voided
    /// * `Ok(false)` - receipt was no longer active
    pub async fn mark_void(
        conn: &mut SqliteConnection,
        id: &str,
        reason: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE offline_receipts SET
                status = ?2, void_reason = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?5
            "#,
        )
        .bind(id)
        .bind(OfflineReceiptStatus::Void)
        .bind(reason)
        .bind(Utc::now())
        .bind(OfflineReceiptStatus::Active)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks a receipt superseded by its correction (guarded: must still be
    /// active and not already corrected).
    ///
    /// ## Returns
    /// * `Ok(true)` - link recorded
    /// * `Ok(false)` - receipt was voided or already corrected
    pub async fn mark_corrected(
        conn: &mut SqliteConnection,
        id: &str,
        corrected_by_receipt_id: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE offline_receipts SET
                status = ?2, corrected_by_receipt_id = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?5 AND corrected_by_receipt_id IS NULL
            "#,
        )
        .bind(id)
        .bind(OfflineReceiptStatus::Corrected)
        .bind(corrected_by_receipt_id)
        .bind(Utc::now())
        .bind(OfflineReceiptStatus::Active)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

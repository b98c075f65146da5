//! # Counter Receipt Service
//!
//! Walk-in counter sale receipts, numbered `SS/YY/NNNN`. The SS stream is
//! wholly independent of the ORD stream: each financial year counts its own
//! receipts from 1, and neither stream ever sees the other's numbers.
//!
//! ## Lifecycle
//! ```text
//! issue ──► Active ──void────► Void       (kept for the audit trail)
//!              │
//!              └────correct──► Corrected  (superseded by a replacement
//!                                          receipt; at most one correction)
//! ```
//!
//! Nothing is ever deleted: a voided receipt keeps its number, a corrected
//! receipt points at its replacement and vice versa.

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use volta_core::receipt::{format_receipt_number, period_key, ReceiptPrefix};
use volta_core::validation::validate_receipt_totals;
use volta_core::{CoreError, OfflineReceipt, OfflineReceiptStatus};
use volta_db::repository::audit::AuditRepository;
use volta_db::repository::receipt::OfflineReceiptRepository;
use volta_db::Database;

use crate::context::AuditContext;
use crate::error::{EngineError, EngineResult};

/// Monetary fields of a receipt to issue.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueReceiptRequest {
    pub customer_name: Option<String>,
    pub subtotal_paise: i64,
    pub tax_amount_paise: i64,
    pub discount_amount_paise: i64,
    /// Must equal subtotal + tax − discount.
    pub grand_total_paise: i64,
}

/// Issues and manages counter receipts.
#[derive(Clone)]
pub struct ReceiptService {
    db: Database,
}

impl ReceiptService {
    pub fn new(db: Database) -> Self {
        ReceiptService { db }
    }

    /// Issues a new counter receipt with the next SS sequence number.
    ///
    /// A lost sequence race is replayed once; a second loss surfaces as a
    /// conflict.
    pub async fn issue_receipt(
        &self,
        ctx: &AuditContext,
        request: IssueReceiptRequest,
    ) -> EngineResult<OfflineReceipt> {
        match self.try_issue(ctx, &request, None).await {
            Err(err) if err.is_conflict() => {
                debug!("Lost SS sequence race, replaying issue");
                self.try_issue(ctx, &request, None).await
            }
            other => other,
        }
    }

    /// Voids an Active receipt. The number stays burned.
    pub async fn void_receipt(
        &self,
        ctx: &AuditContext,
        receipt_id: &str,
        reason: &str,
    ) -> EngineResult<OfflineReceipt> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let receipt = OfflineReceiptRepository::fetch_for_update(tx.as_mut(), receipt_id).await?;
        if !receipt.can_void() {
            return Err(invalid_state(&receipt, "void"));
        }

        let voided = OfflineReceiptRepository::mark_void(tx.as_mut(), receipt_id, reason).await?;
        if !voided {
            return Err(EngineError::Conflict(format!(
                "receipt {receipt_id} left Active concurrently"
            )));
        }

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry("receipt.void", "offline_receipt", receipt_id, Some(reason.to_string())),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(%receipt_id, %reason, "Receipt voided");
        self.fetch(receipt_id).await
    }

    /// Corrects an Active receipt: issues a replacement with the next SS
    /// sequence and links the two. Each receipt can be corrected at most
    /// once; the replacement is a normal Active receipt.
    pub async fn correct_receipt(
        &self,
        ctx: &AuditContext,
        original_id: &str,
        request: IssueReceiptRequest,
    ) -> EngineResult<OfflineReceipt> {
        match self.try_correct(ctx, original_id, &request).await {
            Err(err) if err.is_conflict() => {
                debug!("Lost SS sequence race, replaying correction");
                self.try_correct(ctx, original_id, &request).await
            }
            other => other,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn try_issue(
        &self,
        ctx: &AuditContext,
        request: &IssueReceiptRequest,
        original_receipt_id: Option<&str>,
    ) -> EngineResult<OfflineReceipt> {
        validate_receipt_totals(
            request.subtotal_paise,
            request.tax_amount_paise,
            request.discount_amount_paise,
            request.grand_total_paise,
        )?;

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;
        let receipt = self.insert_receipt(tx.as_mut(), ctx, request, original_receipt_id).await?;
        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(receipt = %receipt.receipt_number, "Receipt issued");
        Ok(receipt)
    }

    async fn try_correct(
        &self,
        ctx: &AuditContext,
        original_id: &str,
        request: &IssueReceiptRequest,
    ) -> EngineResult<OfflineReceipt> {
        validate_receipt_totals(
            request.subtotal_paise,
            request.tax_amount_paise,
            request.discount_amount_paise,
            request.grand_total_paise,
        )?;

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let original = OfflineReceiptRepository::fetch_for_update(tx.as_mut(), original_id).await?;
        if !original.can_correct() {
            return Err(invalid_state(&original, "correct"));
        }

        let replacement = self
            .insert_receipt(tx.as_mut(), ctx, request, Some(original_id))
            .await?;

        let linked =
            OfflineReceiptRepository::mark_corrected(tx.as_mut(), original_id, &replacement.id)
                .await?;
        if !linked {
            return Err(EngineError::Conflict(format!(
                "receipt {original_id} left Active concurrently"
            )));
        }

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry(
                "receipt.correct",
                "offline_receipt",
                original_id,
                Some(format!("replaced by {}", replacement.receipt_number)),
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(
            original = %original.receipt_number,
            replacement = %replacement.receipt_number,
            "Receipt corrected"
        );
        Ok(replacement)
    }

    /// Allocates the next SS sequence and inserts the receipt, inside the
    /// caller's transaction.
    async fn insert_receipt(
        &self,
        conn: &mut sqlx::SqliteConnection,
        ctx: &AuditContext,
        request: &IssueReceiptRequest,
        original_receipt_id: Option<&str>,
    ) -> EngineResult<OfflineReceipt> {
        let financial_year = period_key(Utc::now().date_naive());
        let sequence = OfflineReceiptRepository::next_sequence(conn, &financial_year).await?;
        let number = format_receipt_number(ReceiptPrefix::CounterSale, &financial_year, sequence);

        let now = Utc::now();
        let receipt = OfflineReceipt {
            id: Uuid::new_v4().to_string(),
            receipt_number: number.clone(),
            financial_year,
            sequence_number: sequence,
            customer_name: request.customer_name.clone(),
            status: OfflineReceiptStatus::Active,
            subtotal_paise: request.subtotal_paise,
            tax_amount_paise: request.tax_amount_paise,
            discount_amount_paise: request.discount_amount_paise,
            grand_total_paise: request.grand_total_paise,
            original_receipt_id: original_receipt_id.map(str::to_string),
            corrected_by_receipt_id: None,
            void_reason: None,
            created_at: now,
            updated_at: now,
        };

        OfflineReceiptRepository::insert_in_tx(conn, &receipt).await?;
        AuditRepository::log_in_tx(
            conn,
            &ctx.entry("receipt.issue", "offline_receipt", &receipt.id, Some(number)),
        )
        .await?;

        Ok(receipt)
    }

    async fn fetch(&self, receipt_id: &str) -> EngineResult<OfflineReceipt> {
        self.db
            .offline_receipts()
            .get_by_id(receipt_id)
            .await?
            .ok_or_else(|| EngineError::not_found("OfflineReceipt", receipt_id))
    }
}

fn invalid_state(receipt: &OfflineReceipt, attempted: &str) -> EngineError {
    let current = match receipt.status {
        OfflineReceiptStatus::Active => "Active (already corrected)",
        OfflineReceiptStatus::Void => "Void",
        OfflineReceiptStatus::Corrected => "Corrected",
    };
    CoreError::InvalidTransition {
        entity: "receipt",
        id: receipt.id.clone(),
        current: current.to_string(),
        attempted: attempted.to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

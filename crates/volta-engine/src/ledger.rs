//! # Ledger Entry Service
//!
//! Back-office bookkeeping: one DailySales and one DailyExpenditure row per
//! calendar date, any number of purchase entries. These three tables are the
//! ONLY inputs to financial reporting - orders and receipts never feed it.
//!
//! Derived columns (cash split, subtotals) are computed here from validated
//! input; the second-row-per-date rule is enforced by UNIQUE indexes and
//! surfaces as a conflict. Every entry commits together with its activity-log
//! row in one transaction.

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use volta_core::validation::{expenditure_total, sales_split, validate_amount_paise};
use volta_core::{DailyExpenditure, DailySales, PurchaseEntry, ValidationError};
use volta_db::repository::audit::AuditRepository;
use volta_db::repository::ledger::LedgerRepository;
use volta_db::Database;

use crate::context::AuditContext;
use crate::error::EngineResult;

/// Records ledger entries.
#[derive(Clone)]
pub struct LedgerService {
    db: Database,
}

impl LedgerService {
    pub fn new(db: Database) -> Self {
        LedgerService { db }
    }

    /// Records the day's takings. A second row for the same date is a
    /// conflict; use [`LedgerService::amend_daily_sales`] to change a day.
    pub async fn record_daily_sales(
        &self,
        ctx: &AuditContext,
        entry_date: NaiveDate,
        total_sales_paise: i64,
        online_received_paise: i64,
        labor_charge_paise: Option<i64>,
        delivery_charge_paise: Option<i64>,
        notes: Option<String>,
    ) -> EngineResult<DailySales> {
        let split = sales_split(total_sales_paise, online_received_paise)?;
        if let Some(paise) = labor_charge_paise {
            validate_amount_paise("labor_charge", paise)?;
        }
        if let Some(paise) = delivery_charge_paise {
            validate_amount_paise("delivery_charge", paise)?;
        }

        let now = Utc::now();
        let entry = DailySales {
            id: Uuid::new_v4().to_string(),
            entry_date,
            total_sales_paise,
            online_received_paise,
            cash_received_paise: split.cash_paise,
            labor_charge_paise,
            delivery_charge_paise,
            subtotal_paise: split.subtotal_paise,
            notes,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;
        LedgerRepository::insert_daily_sales_in_tx(tx.as_mut(), &entry).await?;
        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry("ledger.daily_sales", "ledger", &entry.id, Some(entry_date.to_string())),
        )
        .await?;
        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(date = %entry_date, total_paise = total_sales_paise, "Daily sales recorded");
        Ok(entry)
    }

    /// Amends an existing day's takings row (same derivations as recording).
    pub async fn amend_daily_sales(
        &self,
        ctx: &AuditContext,
        entry_date: NaiveDate,
        total_sales_paise: i64,
        online_received_paise: i64,
        labor_charge_paise: Option<i64>,
        delivery_charge_paise: Option<i64>,
        notes: Option<String>,
    ) -> EngineResult<DailySales> {
        let split = sales_split(total_sales_paise, online_received_paise)?;

        let mut entry = self
            .db
            .ledger()
            .get_daily_sales(entry_date)
            .await?
            .ok_or_else(|| crate::error::EngineError::not_found(
                "DailySales",
                entry_date.to_string(),
            ))?;

        entry.total_sales_paise = total_sales_paise;
        entry.online_received_paise = online_received_paise;
        entry.cash_received_paise = split.cash_paise;
        entry.subtotal_paise = split.subtotal_paise;
        entry.labor_charge_paise = labor_charge_paise;
        entry.delivery_charge_paise = delivery_charge_paise;
        entry.notes = notes;
        entry.updated_at = Utc::now();

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;
        LedgerRepository::update_daily_sales_in_tx(tx.as_mut(), &entry).await?;
        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry(
                "ledger.daily_sales.amend",
                "ledger",
                &entry.id,
                Some(entry_date.to_string()),
            ),
        )
        .await?;
        tx.commit().await.map_err(volta_db::DbError::from)?;

        Ok(entry)
    }

    /// Records the day's spending. One row per date.
    pub async fn record_daily_expenditure(
        &self,
        ctx: &AuditContext,
        entry_date: NaiveDate,
        online_amount_paise: Option<i64>,
        cash_amount_paise: Option<i64>,
        notes: Option<String>,
    ) -> EngineResult<DailyExpenditure> {
        let total_paise = expenditure_total(online_amount_paise, cash_amount_paise)?;

        let now = Utc::now();
        let entry = DailyExpenditure {
            id: Uuid::new_v4().to_string(),
            entry_date,
            online_amount_paise,
            cash_amount_paise,
            total_paise,
            notes,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;
        LedgerRepository::insert_daily_expenditure_in_tx(tx.as_mut(), &entry).await?;
        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry(
                "ledger.daily_expenditure",
                "ledger",
                &entry.id,
                Some(entry_date.to_string()),
            ),
        )
        .await?;
        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(date = %entry_date, total_paise, "Daily expenditure recorded");
        Ok(entry)
    }

    /// Records a supplier purchase. Several per day are normal; the cost
    /// must be positive.
    pub async fn record_purchase(
        &self,
        ctx: &AuditContext,
        entry_date: NaiveDate,
        supplier_name: &str,
        description: Option<String>,
        total_cost_paise: i64,
    ) -> EngineResult<PurchaseEntry> {
        if supplier_name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "supplier_name".to_string(),
            }
            .into());
        }
        if total_cost_paise <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "total_cost".to_string(),
            }
            .into());
        }

        let entry = PurchaseEntry {
            id: Uuid::new_v4().to_string(),
            entry_date,
            supplier_name: supplier_name.trim().to_string(),
            description,
            total_cost_paise,
            created_at: Utc::now(),
        };

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;
        LedgerRepository::insert_purchase_in_tx(tx.as_mut(), &entry).await?;
        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry("ledger.purchase", "ledger", &entry.id, Some(entry_date.to_string())),
        )
        .await?;
        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(date = %entry_date, supplier = %entry.supplier_name, "Purchase recorded");
        Ok(entry)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

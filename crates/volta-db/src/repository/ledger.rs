//! # Ledger Repository
//!
//! The three manually entered financial ledgers (daily sales, daily
//! expenditure, purchase entries) and every aggregation the reporting
//! engine runs over them.
//!
//! ## Isolation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  This repository is the ONLY financial data source.                     │
//! │                                                                         │
//! │  daily_sales ─────┐                                                     │
//! │  daily_expenditure ├──► range sums / period buckets ──► reports        │
//! │  purchase_entries ─┘                                                    │
//! │                                                                         │
//! │  Orders and appointments NEVER appear in any query here. Confirming,   │
//! │  cancelling or delivering an order cannot move a reported figure by    │
//! │  construction - the tables simply aren't joined.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! One row per calendar date for sales and expenditure is enforced by
//! UNIQUE(entry_date); the duplicate-date insert surfaces as a
//! UniqueViolation, never a silent overwrite.

use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use volta_core::analytics::{PeriodRow, ProfitLoss};
use volta_core::{DailyExpenditure, DailySales, PurchaseEntry};

/// Repository for the financial ledgers.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // =========================================================================
    // Daily sales
    // =========================================================================

    /// Inserts a daily sales row inside the caller's transaction, so the
    /// ledger write commits together with its activity entry.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - a row for this date already exists
    pub async fn insert_daily_sales_in_tx(
        conn: &mut SqliteConnection,
        entry: &DailySales,
    ) -> DbResult<()> {
        debug!(date = %entry.entry_date, "Recording daily sales");

        sqlx::query(
            r#"
            INSERT INTO daily_sales (
                id, entry_date, total_sales_paise, online_received_paise,
                cash_received_paise, labor_charge_paise, delivery_charge_paise,
                subtotal_paise, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.entry_date)
        .bind(entry.total_sales_paise)
        .bind(entry.online_received_paise)
        .bind(entry.cash_received_paise)
        .bind(entry.labor_charge_paise)
        .bind(entry.delivery_charge_paise)
        .bind(entry.subtotal_paise)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets the sales row for a date.
    pub async fn get_daily_sales(&self, date: NaiveDate) -> DbResult<Option<DailySales>> {
        let entry = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT id, entry_date, total_sales_paise, online_received_paise,
                   cash_received_paise, labor_charge_paise, delivery_charge_paise,
                   subtotal_paise, notes, created_at, updated_at
            FROM daily_sales
            WHERE entry_date = ?1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Replaces the figures of an existing sales row (explicit edit, not an
    /// upsert - the date must already exist). Runs inside the caller's
    /// transaction.
    pub async fn update_daily_sales_in_tx(
        conn: &mut SqliteConnection,
        entry: &DailySales,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE daily_sales SET
                total_sales_paise = ?2, online_received_paise = ?3,
                cash_received_paise = ?4, labor_charge_paise = ?5,
                delivery_charge_paise = ?6, subtotal_paise = ?7,
                notes = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&entry.id)
        .bind(entry.total_sales_paise)
        .bind(entry.online_received_paise)
        .bind(entry.cash_received_paise)
        .bind(entry.labor_charge_paise)
        .bind(entry.delivery_charge_paise)
        .bind(entry.subtotal_paise)
        .bind(&entry.notes)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DailySales", &entry.id));
        }

        Ok(())
    }

    // =========================================================================
    // Daily expenditure
    // =========================================================================

    /// Inserts a daily expenditure row inside the caller's transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - a row for this date already exists
    pub async fn insert_daily_expenditure_in_tx(
        conn: &mut SqliteConnection,
        entry: &DailyExpenditure,
    ) -> DbResult<()> {
        debug!(date = %entry.entry_date, "Recording daily expenditure");

        sqlx::query(
            r#"
            INSERT INTO daily_expenditure (
                id, entry_date, online_amount_paise, cash_amount_paise,
                total_paise, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.entry_date)
        .bind(entry.online_amount_paise)
        .bind(entry.cash_amount_paise)
        .bind(entry.total_paise)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets the expenditure row for a date.
    pub async fn get_daily_expenditure(
        &self,
        date: NaiveDate,
    ) -> DbResult<Option<DailyExpenditure>> {
        let entry = sqlx::query_as::<_, DailyExpenditure>(
            r#"
            SELECT id, entry_date, online_amount_paise, cash_amount_paise,
                   total_paise, notes, created_at, updated_at
            FROM daily_expenditure
            WHERE entry_date = ?1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    // =========================================================================
    // Purchase entries
    // =========================================================================

    /// Inserts a purchase entry inside the caller's transaction. Several
    /// per date are expected.
    pub async fn insert_purchase_in_tx(
        conn: &mut SqliteConnection,
        entry: &PurchaseEntry,
    ) -> DbResult<()> {
        debug!(date = %entry.entry_date, supplier = %entry.supplier_name, "Recording purchase");

        sqlx::query(
            r#"
            INSERT INTO purchase_entries (
                id, entry_date, supplier_name, description, total_cost_paise, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.entry_date)
        .bind(&entry.supplier_name)
        .bind(&entry.description)
        .bind(entry.total_cost_paise)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Lists purchases over a date range, oldest first.
    pub async fn list_purchases(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<PurchaseEntry>> {
        let entries = sqlx::query_as::<_, PurchaseEntry>(
            r#"
            SELECT id, entry_date, supplier_name, description, total_cost_paise, created_at
            FROM purchase_entries
            WHERE entry_date >= ?1 AND entry_date <= ?2
            ORDER BY entry_date, created_at
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    // =========================================================================
    // Aggregation (reporting inputs)
    // =========================================================================

    /// The three ledger sums over an inclusive date range.
    pub async fn profit_loss(&self, from: NaiveDate, to: NaiveDate) -> DbResult<ProfitLoss> {
        let sales: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_sales_paise), 0) FROM daily_sales \
             WHERE entry_date >= ?1 AND entry_date <= ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let expenditure: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_paise), 0) FROM daily_expenditure \
             WHERE entry_date >= ?1 AND entry_date <= ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let purchases: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cost_paise), 0) FROM purchase_entries \
             WHERE entry_date >= ?1 AND entry_date <= ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProfitLoss {
            sales_total_paise: sales,
            expenditure_total_paise: expenditure,
            purchase_total_paise: purchases,
        })
    }

    /// Period buckets over a date range, keyed by an SQLite strftime format.
    ///
    /// `bucket_format` examples:
    /// * `"%Y-%m-%d"` - daily series
    /// * `"%Y-%m"` - monthly series
    /// * `"%Y"` - yearly series
    /// * `"%w"` - weekday index (0 = Sunday); caller maps to labels
    ///
    /// Buckets come back ascending by key; dates with no ledger rows simply
    /// don't appear (callers pad with [`PeriodRow::empty`] if they need a
    /// dense series).
    pub async fn period_rows(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        bucket_format: &str,
    ) -> DbResult<Vec<PeriodRow>> {
        // Three ledgers, one bucket key each, stitched with full outer
        // UNION semantics: a bucket appears if ANY ledger has rows in it.
        let rows = sqlx::query(
            r#"
            SELECT
                bucket,
                COALESCE(SUM(sales), 0)       AS sales_total,
                COALESCE(SUM(online), 0)      AS online_total,
                COALESCE(SUM(cash), 0)        AS cash_total,
                COALESCE(SUM(expenditure), 0) AS expenditure_total,
                COALESCE(SUM(purchases), 0)   AS purchase_total
            FROM (
                SELECT strftime(?3, entry_date) AS bucket,
                       total_sales_paise AS sales,
                       online_received_paise AS online,
                       cash_received_paise AS cash,
                       0 AS expenditure, 0 AS purchases
                FROM daily_sales
                WHERE entry_date >= ?1 AND entry_date <= ?2
                UNION ALL
                SELECT strftime(?3, entry_date), 0, 0, 0, total_paise, 0
                FROM daily_expenditure
                WHERE entry_date >= ?1 AND entry_date <= ?2
                UNION ALL
                SELECT strftime(?3, entry_date), 0, 0, 0, 0, total_cost_paise
                FROM purchase_entries
                WHERE entry_date >= ?1 AND entry_date <= ?2
            )
            GROUP BY bucket
            ORDER BY bucket
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(bucket_format)
        .fetch_all(&self.pool)
        .await?;

        let mut buckets = Vec::with_capacity(rows.len());
        for row in rows {
            buckets.push(PeriodRow {
                period_label: row.try_get("bucket").map_err(DbError::from)?,
                sales_total_paise: row.try_get("sales_total").map_err(DbError::from)?,
                online_total_paise: row.try_get("online_total").map_err(DbError::from)?,
                cash_total_paise: row.try_get("cash_total").map_err(DbError::from)?,
                expenditure_total_paise: row
                    .try_get("expenditure_total")
                    .map_err(DbError::from)?,
                purchase_total_paise: row.try_get("purchase_total").map_err(DbError::from)?,
            });
        }

        Ok(buckets)
    }

    /// Monthly sales totals (oldest first) feeding the growth series.
    pub async fn monthly_sales_series(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<i64>> {
        let totals: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_sales_paise), 0)
            FROM daily_sales
            WHERE entry_date >= ?1 AND entry_date <= ?2
            GROUP BY strftime('%Y-%m', entry_date)
            ORDER BY strftime('%Y-%m', entry_date)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sales(day: NaiveDate, total: i64, online: i64) -> DailySales {
        let now = Utc::now();
        DailySales {
            id: Uuid::new_v4().to_string(),
            entry_date: day,
            total_sales_paise: total,
            online_received_paise: online,
            cash_received_paise: total - online,
            labor_charge_paise: None,
            delivery_charge_paise: None,
            subtotal_paise: total,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn expenditure(day: NaiveDate, total: i64) -> DailyExpenditure {
        let now = Utc::now();
        DailyExpenditure {
            id: Uuid::new_v4().to_string(),
            entry_date: day,
            online_amount_paise: Some(total),
            cash_amount_paise: None,
            total_paise: total,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn purchase(day: NaiveDate, cost: i64) -> PurchaseEntry {
        PurchaseEntry {
            id: Uuid::new_v4().to_string(),
            entry_date: day,
            supplier_name: "Sharma Electricals".into(),
            description: None,
            total_cost_paise: cost,
            created_at: Utc::now(),
        }
    }

    async fn put_sales(db: &Database, entry: &DailySales) -> DbResult<()> {
        let mut tx = db.pool().begin().await.unwrap();
        LedgerRepository::insert_daily_sales_in_tx(tx.as_mut(), entry).await?;
        tx.commit().await.unwrap();
        Ok(())
    }

    async fn put_expenditure(db: &Database, entry: &DailyExpenditure) -> DbResult<()> {
        let mut tx = db.pool().begin().await.unwrap();
        LedgerRepository::insert_daily_expenditure_in_tx(tx.as_mut(), entry).await?;
        tx.commit().await.unwrap();
        Ok(())
    }

    async fn put_purchase(db: &Database, entry: &PurchaseEntry) -> DbResult<()> {
        let mut tx = db.pool().begin().await.unwrap();
        LedgerRepository::insert_purchase_in_tx(tx.as_mut(), entry).await?;
        tx.commit().await.unwrap();
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_sales_date_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2026, 3, 14);
        put_sales(&db, &sales(day, 100_000, 40_000)).await.unwrap();

        let err = put_sales(&db, &sales(day, 200_000, 0)).await.unwrap_err();
        assert!(err.is_unique_violation());

        // Original row untouched
        let row = db.ledger().get_daily_sales(day).await.unwrap().unwrap();
        assert_eq!(row.total_sales_paise, 100_000);
    }

    #[tokio::test]
    async fn test_duplicate_expenditure_date_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2026, 3, 14);
        put_expenditure(&db, &expenditure(day, 30_000)).await.unwrap();

        let err = put_expenditure(&db, &expenditure(day, 5_000)).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_multiple_purchases_same_date_allowed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2026, 3, 14);
        put_purchase(&db, &purchase(day, 10_000)).await.unwrap();
        put_purchase(&db, &purchase(day, 25_000)).await.unwrap();

        let entries = db.ledger().list_purchases(day, day).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_profit_loss_sums_all_three_ledgers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let d1 = date(2026, 3, 10);
        let d2 = date(2026, 3, 11);

        put_sales(&db, &sales(d1, 1_000_000, 600_000)).await.unwrap();
        put_sales(&db, &sales(d2, 500_000, 0)).await.unwrap();
        put_expenditure(&db, &expenditure(d1, 300_000)).await.unwrap();
        put_purchase(&db, &purchase(d2, 250_000)).await.unwrap();

        let pl = db.ledger().profit_loss(d1, d2).await.unwrap();
        assert_eq!(pl.sales_total_paise, 1_500_000);
        assert_eq!(pl.expenditure_total_paise, 300_000);
        assert_eq!(pl.purchase_total_paise, 250_000);
        assert_eq!(pl.profit().paise(), 950_000);

        // Range excludes rows outside it
        let narrow = db.ledger().profit_loss(d1, d1).await.unwrap();
        assert_eq!(narrow.sales_total_paise, 1_000_000);
        assert_eq!(narrow.purchase_total_paise, 0);
    }

    #[tokio::test]
    async fn test_period_rows_monthly_buckets() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        put_sales(&db, &sales(date(2026, 2, 28), 400_000, 100_000)).await.unwrap();
        put_sales(&db, &sales(date(2026, 3, 1), 600_000, 600_000)).await.unwrap();
        put_expenditure(&db, &expenditure(date(2026, 3, 2), 50_000)).await.unwrap();

        let rows = db
            .ledger()
            .period_rows(date(2026, 2, 1), date(2026, 3, 31), "%Y-%m")
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period_label, "2026-02");
        assert_eq!(rows[0].sales_total_paise, 400_000);
        assert_eq!(rows[1].period_label, "2026-03");
        assert_eq!(rows[1].sales_total_paise, 600_000);
        assert_eq!(rows[1].online_pct(), 100.0);
        assert_eq!(rows[1].expenditure_total_paise, 50_000);
    }

    #[tokio::test]
    async fn test_monthly_sales_series_feeds_growth() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        put_sales(&db, &sales(date(2026, 1, 15), 1_000_000, 0)).await.unwrap();
        put_sales(&db, &sales(date(2026, 2, 15), 1_200_000, 0)).await.unwrap();

        let series = db
            .ledger()
            .monthly_sales_series(date(2026, 1, 1), date(2026, 2, 28))
            .await
            .unwrap();
        assert_eq!(series, vec![1_000_000, 1_200_000]);
        assert_eq!(volta_core::analytics::month_over_month_growth(&series), 20.0);
    }
}

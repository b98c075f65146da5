//! # Financial Reporting Engine
//!
//! All financial figures come from the three ledger tables (daily_sales,
//! daily_expenditure, purchase_entries) and nowhere else. The engine struct
//! owns a [`LedgerRepository`] and nothing that could reach orders,
//! appointments or receipts; there is no code path from reporting to
//! operational rows.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  daily_sales ─────┐                                                     │
//! │  daily_expenditure├──► ReportingEngine ──► ProfitLoss / PeriodRow       │
//! │  purchase_entries ┘                        series / Insights            │
//! │                                                                         │
//! │  orders ──────X  (no path; attempts land in the financial guard log)   │
//! │  offline_receipts X                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use volta_core::analytics::{
    month_over_month_growth, quarter_label, quarter_of_month, weekday_label, PeriodRow,
    ProfitLoss,
};
use volta_db::repository::ledger::LedgerRepository;
use volta_db::Database;

use crate::error::{EngineError, EngineResult};
use crate::guard::FinancialGuard;

/// Headline numbers for a reporting range.
#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    /// Highest-sales day in the range (first such day on a tie).
    pub best_day: Option<PeriodRow>,
    /// Lowest-sales day in the range (first such day on a tie).
    pub worst_day: Option<PeriodRow>,
    /// Highest-sales month in the range.
    pub best_month: Option<PeriodRow>,
    /// Growth of the latest month over the one before, as a percentage.
    pub month_over_month_pct: f64,
}

/// Computes financial reports from ledger rows only.
#[derive(Clone)]
pub struct ReportingEngine {
    ledger: LedgerRepository,
    guard: FinancialGuard,
}

impl ReportingEngine {
    /// Builds the engine from a database handle. Only the ledger repository
    /// and the guard are retained.
    pub fn new(db: &Database) -> Self {
        ReportingEngine {
            ledger: db.ledger(),
            guard: FinancialGuard::new(db.audit()),
        }
    }

    /// Net position over a date range: the three ledger sums and their
    /// difference.
    pub async fn profit_loss(&self, from: NaiveDate, to: NaiveDate) -> EngineResult<ProfitLoss> {
        Ok(self.ledger.profit_loss(from, to).await?)
    }

    /// Per-day buckets, ascending. Days with no ledger rows are omitted.
    pub async fn daily_series(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<PeriodRow>> {
        Ok(self.ledger.period_rows(from, to, "%Y-%m-%d").await?)
    }

    /// Per-month buckets, ascending.
    pub async fn monthly_series(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<PeriodRow>> {
        Ok(self.ledger.period_rows(from, to, "%Y-%m").await?)
    }

    /// Per-year buckets, ascending.
    pub async fn yearly_series(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<PeriodRow>> {
        Ok(self.ledger.period_rows(from, to, "%Y").await?)
    }

    /// The four quarters of a calendar year, all present, empty quarters
    /// zero-filled.
    pub async fn quarterly_series(&self, year: i32) -> EngineResult<Vec<PeriodRow>> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| EngineError::Conflict(format!("invalid year {year}")))?;
        let to = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| EngineError::Conflict(format!("invalid year {year}")))?;

        let months = self.ledger.period_rows(from, to, "%Y-%m").await?;

        let mut quarters: Vec<PeriodRow> = (1..=4)
            .map(|q| PeriodRow::empty(quarter_label(year, q)))
            .collect();

        for month in months {
            // Bucket labels are "YYYY-MM"
            let Some(month_number) = month
                .period_label
                .rsplit('-')
                .next()
                .and_then(|m| m.parse::<u32>().ok())
            else {
                continue;
            };
            let quarter = &mut quarters[(quarter_of_month(month_number) - 1) as usize];
            quarter.sales_total_paise += month.sales_total_paise;
            quarter.online_total_paise += month.online_total_paise;
            quarter.cash_total_paise += month.cash_total_paise;
            quarter.expenditure_total_paise += month.expenditure_total_paise;
            quarter.purchase_total_paise += month.purchase_total_paise;
        }

        Ok(quarters)
    }

    /// Sales grouped by weekday, Sunday through Saturday, all seven present.
    pub async fn weekday_series(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<PeriodRow>> {
        let raw = self.ledger.period_rows(from, to, "%w").await?;

        let mut buckets: Vec<PeriodRow> = (0..7)
            .map(|i| PeriodRow::empty(weekday_label(i).unwrap_or("Unknown")))
            .collect();

        for row in raw {
            let Some(index) = row.period_label.parse::<i64>().ok().filter(|i| (0..7).contains(i))
            else {
                continue;
            };
            let bucket = &mut buckets[index as usize];
            bucket.sales_total_paise += row.sales_total_paise;
            bucket.online_total_paise += row.online_total_paise;
            bucket.cash_total_paise += row.cash_total_paise;
            bucket.expenditure_total_paise += row.expenditure_total_paise;
            bucket.purchase_total_paise += row.purchase_total_paise;
        }

        Ok(buckets)
    }

    /// Headline insights for a range: best/worst day, best month, and
    /// month-over-month growth. Ties resolve to the earliest bucket.
    pub async fn insights(&self, from: NaiveDate, to: NaiveDate) -> EngineResult<Insights> {
        let days = self.daily_series(from, to).await?;
        let months = self.monthly_series(from, to).await?;

        let best_day = pick(&days, |a, b| a.sales_total_paise > b.sales_total_paise);
        let worst_day = pick(&days, |a, b| a.sales_total_paise < b.sales_total_paise);
        let best_month = pick(&months, |a, b| a.sales_total_paise > b.sales_total_paise);

        let monthly_sales: Vec<i64> = months.iter().map(|m| m.sales_total_paise).collect();
        let month_over_month_pct = month_over_month_growth(&monthly_sales);

        Ok(Insights {
            best_day,
            worst_day,
            best_month,
            month_over_month_pct,
        })
    }

    /// Refuses a request to derive financial figures from operational data,
    /// recording the attempt in the financial guard log. Hosts route any
    /// such request here instead of building the query.
    pub async fn refuse_operational_read(
        &self,
        source: &str,
        attempted_action: &str,
    ) -> EngineError {
        self.guard.record(source, attempted_action, None).await;
        EngineError::FinancialIsolation {
            attempted: attempted_action.to_string(),
        }
    }

    /// The week-aligned date for tests and hosts that bucket manually.
    pub fn weekday_of(date: NaiveDate) -> &'static str {
        weekday_label(date.weekday().num_days_from_sunday() as i64).unwrap_or("Unknown")
    }
}

/// Strict comparison keeps the FIRST bucket on ties.
fn pick(rows: &[PeriodRow], better: impl Fn(&PeriodRow, &PeriodRow) -> bool) -> Option<PeriodRow> {
    let mut chosen: Option<&PeriodRow> = None;
    for row in rows {
        match chosen {
            None => chosen = Some(row),
            Some(current) if better(row, current) => chosen = Some(row),
            _ => {}
        }
    }
    chosen.cloned()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use volta_core::{Customer, OrderType, Product};
    use volta_db::DbConfig;

    use crate::checkout::{CheckoutService, OrderItemRequest, PlaceOrderRequest};
    use crate::config::EngineConfig;
    use crate::context::AuditContext;
    use crate::fulfillment::FulfillmentService;
    use crate::geocode::FixedDistanceResolver;
    use crate::ledger::LedgerService;

    fn admin() -> AuditContext {
        AuditContext::admin("meera", None)
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    async fn setup() -> (Database, LedgerService, ReportingEngine) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reporting = ReportingEngine::new(&db);
        (db.clone(), LedgerService::new(db), reporting)
    }

    #[tokio::test]
    async fn test_profit_is_sales_minus_spend_minus_purchases() {
        let (_db, ledger, reporting) = setup().await;

        ledger
            .record_daily_sales(&admin(), date(8, 1), 1_000_000, 600_000, None, None, None)
            .await
            .unwrap();
        ledger
            .record_daily_expenditure(&admin(), date(8, 1), Some(150_000), Some(50_000), None)
            .await
            .unwrap();
        ledger
            .record_purchase(&admin(), date(8, 2), "Polycab Wires", None, 300_000)
            .await
            .unwrap();

        let pl = reporting.profit_loss(date(8, 1), date(8, 31)).await.unwrap();
        assert_eq!(pl.sales_total_paise, 1_000_000);
        assert_eq!(pl.expenditure_total_paise, 200_000);
        assert_eq!(pl.purchase_total_paise, 300_000);
        assert_eq!(pl.profit().paise(), 500_000);
    }

    #[tokio::test]
    async fn test_reports_ignore_order_activity() {
        // Orders worth ₹500 are placed, confirmed and cancelled; the ledger
        // has one manual row. Reporting must only ever see the ledger row.
        let (db, ledger, reporting) = setup().await;

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Asha Verma".into(),
            phone: "9876543210".into(),
            email: None,
            address: "12 MG Road, Indore".into(),
            pincode: "452001".into(),
            free_delivery_used_count: 0,
            created_at: now,
            updated_at: now,
        };
        db.customers().insert(&customer).await.unwrap();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: "FAN-1200-WH".into(),
            name: "Ceiling Fan".into(),
            description: None,
            category: None,
            price_paise: 50_000,
            stock_quantity: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();

        ledger
            .record_daily_sales(&admin(), Utc::now().date_naive(), 250_000, 0, None, None, None)
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let before = reporting.profit_loss(today, today).await.unwrap();

        let checkout =
            CheckoutService::new(db.clone(), Arc::new(FixedDistanceResolver::new(4.0)));
        let fulfillment = FulfillmentService::new(db.clone(), EngineConfig::default());
        let order = checkout
            .place_order(
                &AuditContext::customer(&customer.phone, None),
                PlaceOrderRequest {
                    customer_id: customer.id.clone(),
                    order_type: OrderType::Standard,
                    delivery_address: customer.address.clone(),
                    items: vec![OrderItemRequest {
                        product_id: product.id.clone(),
                        quantity: 1,
                    }],
                },
            )
            .await
            .unwrap();
        fulfillment.confirm_order(&admin(), &order.id, None).await.unwrap();
        fulfillment
            .cancel_order(&admin(), &order.id, "test")
            .await
            .unwrap();

        let after = reporting.profit_loss(today, today).await.unwrap();
        assert_eq!(before.sales_total_paise, after.sales_total_paise);
        assert_eq!(before.profit().paise(), after.profit().paise());
        assert_eq!(after.sales_total_paise, 250_000);
    }

    #[tokio::test]
    async fn test_quarterly_series_zero_fills_empty_quarters() {
        let (_db, ledger, reporting) = setup().await;

        ledger
            .record_daily_sales(&admin(), date(2, 10), 400_000, 0, None, None, None)
            .await
            .unwrap();
        ledger
            .record_daily_sales(&admin(), date(8, 5), 700_000, 0, None, None, None)
            .await
            .unwrap();

        let quarters = reporting.quarterly_series(2026).await.unwrap();
        assert_eq!(quarters.len(), 4);
        assert_eq!(quarters[0].period_label, "2026-Q1");
        assert_eq!(quarters[0].sales_total_paise, 400_000);
        assert_eq!(quarters[1].sales_total_paise, 0);
        assert_eq!(quarters[2].sales_total_paise, 700_000);
        assert_eq!(quarters[3].sales_total_paise, 0);
    }

    #[tokio::test]
    async fn test_weekday_series_has_all_seven_days() {
        let (_db, ledger, reporting) = setup().await;

        // 2026-08-03 is a Monday, 2026-08-09 a Sunday
        ledger
            .record_daily_sales(&admin(), date(8, 3), 100_000, 0, None, None, None)
            .await
            .unwrap();
        ledger
            .record_daily_sales(&admin(), date(8, 10), 300_000, 0, None, None, None)
            .await
            .unwrap();
        ledger
            .record_daily_sales(&admin(), date(8, 9), 50_000, 0, None, None, None)
            .await
            .unwrap();

        let series = reporting.weekday_series(date(8, 1), date(8, 31)).await.unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].period_label, "Sunday");
        assert_eq!(series[0].sales_total_paise, 50_000);
        assert_eq!(series[1].period_label, "Monday");
        // Two Mondays fold into one bucket
        assert_eq!(series[1].sales_total_paise, 400_000);
        assert_eq!(series[6].period_label, "Saturday");
        assert_eq!(series[6].sales_total_paise, 0);
    }

    #[tokio::test]
    async fn test_insights_ties_resolve_to_first_day() {
        let (_db, ledger, reporting) = setup().await;

        ledger
            .record_daily_sales(&admin(), date(7, 1), 500_000, 0, None, None, None)
            .await
            .unwrap();
        ledger
            .record_daily_sales(&admin(), date(7, 2), 500_000, 0, None, None, None)
            .await
            .unwrap();
        ledger
            .record_daily_sales(&admin(), date(8, 1), 600_000, 0, None, None, None)
            .await
            .unwrap();

        let insights = reporting.insights(date(7, 1), date(8, 31)).await.unwrap();
        assert_eq!(insights.best_day.unwrap().period_label, "2026-08-01");
        // Tie between the two July days goes to the first
        assert_eq!(insights.worst_day.unwrap().period_label, "2026-07-01");
        // July totals ₹10,000 across two days, beating August's single ₹6,000
        assert_eq!(insights.best_month.unwrap().period_label, "2026-07");
        // July 1.0M → August 0.6M: -40%
        assert_eq!(insights.month_over_month_pct, -40.0);
    }

    #[tokio::test]
    async fn test_refused_operational_read_is_logged() {
        let (db, _ledger, reporting) = setup().await;

        let err = reporting
            .refuse_operational_read("reporting", "read:orders.final_price")
            .await;
        assert!(matches!(err, EngineError::FinancialIsolation { .. }));

        let entries = db.audit().financial_guard_entries(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].attempted_action, "read:orders.final_price");
    }
}

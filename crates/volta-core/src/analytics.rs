//! # Analytics Math
//!
//! Pure arithmetic for the financial reporting engine: percentage splits,
//! growth rates, profit, and period-bucket labels.
//!
//! ## The One Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DIVISION BY ZERO DEGRADES TO 0 - NEVER ERRORS, NEVER NaN               │
//! │                                                                         │
//! │  A dashboard covering an empty month must render "0%" growth and       │
//! │  "0% online", not crash the report. Every ratio in this module         │
//! │  checks its denominator first.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The heavier lifting (date-range SQL sums) happens in volta-db; this module
//! only turns those sums into ratios and rows, so all of it unit-tests
//! without a database.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Ratios
// =============================================================================

/// `part / total × 100`, with a zero total degrading to 0.
///
/// ## Example
/// ```rust
/// use volta_core::analytics::pct;
///
/// assert_eq!(pct(600_000, 1_000_000), 60.0);
/// assert_eq!(pct(5, 0), 0.0);
/// ```
pub fn pct(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// `(latest − previous) / previous × 100`, with a zero (or absent, passed as
/// zero) previous bucket degrading to 0.
///
/// ## Example
/// ```rust
/// use volta_core::analytics::growth_pct;
///
/// assert_eq!(growth_pct(1_200_000, 1_000_000), 20.0);
/// assert_eq!(growth_pct(800_000, 1_000_000), -20.0);
/// assert_eq!(growth_pct(1_200_000, 0), 0.0);
/// ```
pub fn growth_pct(latest: i64, previous: i64) -> f64 {
    if previous == 0 {
        0.0
    } else {
        (latest - previous) as f64 / previous as f64 * 100.0
    }
}

// =============================================================================
// Profit
// =============================================================================

/// The three ledger sums over a date range, and nothing else.
/// `profit = sales − expenditure − purchases`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitLoss {
    pub sales_total_paise: i64,
    pub expenditure_total_paise: i64,
    pub purchase_total_paise: i64,
}

impl ProfitLoss {
    /// Net profit (may be negative).
    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_paise(
            self.sales_total_paise - self.expenditure_total_paise - self.purchase_total_paise,
        )
    }

    /// Sales as Money.
    #[inline]
    pub fn sales(&self) -> Money {
        Money::from_paise(self.sales_total_paise)
    }
}

// =============================================================================
// Period Rows
// =============================================================================

/// One bucket of the reporting series: a day, month, quarter, year or
/// weekday. This row shape is the stable contract the CSV/PDF export
/// collaborator consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodRow {
    /// Bucket key: "2026-03-14", "2026-03", "2026-Q1", "2026" or "Monday".
    pub period_label: String,
    pub sales_total_paise: i64,
    pub online_total_paise: i64,
    pub cash_total_paise: i64,
    pub expenditure_total_paise: i64,
    pub purchase_total_paise: i64,
}

impl PeriodRow {
    /// An all-zero bucket for periods with no ledger rows.
    pub fn empty(period_label: impl Into<String>) -> Self {
        PeriodRow {
            period_label: period_label.into(),
            sales_total_paise: 0,
            online_total_paise: 0,
            cash_total_paise: 0,
            expenditure_total_paise: 0,
            purchase_total_paise: 0,
        }
    }

    /// Bucket profit: sales − expenditure − purchases.
    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_paise(
            self.sales_total_paise - self.expenditure_total_paise - self.purchase_total_paise,
        )
    }

    /// Share of takings received online, 0 for empty buckets.
    #[inline]
    pub fn online_pct(&self) -> f64 {
        pct(self.online_total_paise, self.sales_total_paise)
    }

    /// Share of takings received in cash, 0 for empty buckets.
    #[inline]
    pub fn cash_pct(&self) -> f64 {
        pct(self.cash_total_paise, self.sales_total_paise)
    }
}

/// Month-over-month growth of a monthly series (ordered oldest → latest).
/// Fewer than two buckets, or a zero previous bucket, degrades to 0.
pub fn month_over_month_growth(monthly_sales: &[i64]) -> f64 {
    match monthly_sales {
        [.., previous, latest] => growth_pct(*latest, *previous),
        _ => 0.0,
    }
}

// =============================================================================
// Bucket Labels
// =============================================================================

/// Calendar quarter (1-4) of a month number (1-12).
#[inline]
pub const fn quarter_of_month(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

/// Quarter bucket label, e.g. `2026-Q1`.
pub fn quarter_label(year: i32, quarter: u32) -> String {
    format!("{year}-Q{quarter}")
}

/// Full weekday name from SQLite's `strftime('%w')` index (0 = Sunday).
pub fn weekday_label(index_sunday_zero: i64) -> Option<&'static str> {
    match index_sunday_zero {
        0 => Some("Sunday"),
        1 => Some("Monday"),
        2 => Some("Tuesday"),
        3 => Some("Wednesday"),
        4 => Some("Thursday"),
        5 => Some("Friday"),
        6 => Some("Saturday"),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct() {
        assert_eq!(pct(600_000, 1_000_000), 60.0);
        assert_eq!(pct(1_000_000, 1_000_000), 100.0);
        assert_eq!(pct(0, 1_000_000), 0.0);
    }

    #[test]
    fn test_pct_zero_total_degrades_to_zero() {
        assert_eq!(pct(0, 0), 0.0);
        assert_eq!(pct(500, 0), 0.0);
    }

    #[test]
    fn test_growth_pct() {
        assert_eq!(growth_pct(1_200_000, 1_000_000), 20.0);
        assert_eq!(growth_pct(800_000, 1_000_000), -20.0);
        assert_eq!(growth_pct(1_000_000, 1_000_000), 0.0);
    }

    #[test]
    fn test_growth_pct_zero_previous_degrades_to_zero() {
        assert_eq!(growth_pct(1_200_000, 0), 0.0);
        assert_eq!(growth_pct(0, 0), 0.0);
    }

    #[test]
    fn test_profit_loss() {
        let pl = ProfitLoss {
            sales_total_paise: 10_000_00,
            expenditure_total_paise: 3_000_00,
            purchase_total_paise: 2_500_00,
        };
        assert_eq!(pl.profit(), Money::from_rupees(4500));
    }

    #[test]
    fn test_profit_can_be_negative() {
        let pl = ProfitLoss {
            sales_total_paise: 100_000,
            expenditure_total_paise: 150_000,
            purchase_total_paise: 0,
        };
        assert_eq!(pl.profit(), Money::from_paise(-50_000));
    }

    #[test]
    fn test_period_row_ratios() {
        let row = PeriodRow {
            period_label: "2026-03".into(),
            sales_total_paise: 1_000_000,
            online_total_paise: 600_000,
            cash_total_paise: 400_000,
            expenditure_total_paise: 300_000,
            purchase_total_paise: 100_000,
        };
        assert_eq!(row.online_pct(), 60.0);
        assert_eq!(row.cash_pct(), 40.0);
        assert_eq!(row.profit(), Money::from_paise(600_000));
    }

    #[test]
    fn test_empty_period_row() {
        let row = PeriodRow::empty("2026-Q3");
        assert_eq!(row.online_pct(), 0.0);
        assert_eq!(row.cash_pct(), 0.0);
        assert_eq!(row.profit(), Money::zero());
    }

    #[test]
    fn test_month_over_month_growth() {
        assert_eq!(month_over_month_growth(&[1_000_000, 1_200_000]), 20.0);
        // Only the last two buckets matter
        assert_eq!(month_over_month_growth(&[500, 1_000_000, 1_100_000]), 10.0);
        assert_eq!(month_over_month_growth(&[1_000_000]), 0.0);
        assert_eq!(month_over_month_growth(&[]), 0.0);
        assert_eq!(month_over_month_growth(&[0, 1_000_000]), 0.0);
    }

    #[test]
    fn test_quarter_of_month() {
        assert_eq!(quarter_of_month(1), 1);
        assert_eq!(quarter_of_month(3), 1);
        assert_eq!(quarter_of_month(4), 2);
        assert_eq!(quarter_of_month(12), 4);
        assert_eq!(quarter_label(2026, 2), "2026-Q2");
    }

    #[test]
    fn test_weekday_label() {
        assert_eq!(weekday_label(0), Some("Sunday"));
        assert_eq!(weekday_label(6), Some("Saturday"));
        assert_eq!(weekday_label(7), None);
    }
}

//! # Receipt Numbering
//!
//! Period keys and receipt number formatting. The actual sequence allocation
//! lives in volta-db (it needs the counter table); the business rules about
//! WHAT a receipt number looks like live here.
//!
//! ## Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   ORD/26/0042                     SS/26/0007                            │
//! │   ─┬─ ─┬─ ──┬─                    ─┬ ─┬─ ──┬─                           │
//! │    │   │    └── sequence, 4+ digits, gap-free per financial year        │
//! │    │   └─────── financial year (2-digit calendar year)                  │
//! │    └─────────── prefix: ORD = online order, SS = walk-in receipt        │
//! │                                                                         │
//! │   The two prefixes are numbered INDEPENDENTLY: ORD/26/0001 and          │
//! │   SS/26/0001 coexist.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once assigned to an entity, a receipt number is immutable.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Receipt Prefix
// =============================================================================

/// Which sequence stream a receipt number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptPrefix {
    /// Online orders: `ORD/YY/NNNN`.
    Order,
    /// Walk-in counter sales: `SS/YY/NNNN`.
    CounterSale,
}

impl ReceiptPrefix {
    /// The literal prefix token.
    pub const fn token(&self) -> &'static str {
        match self {
            ReceiptPrefix::Order => "ORD",
            ReceiptPrefix::CounterSale => "SS",
        }
    }
}

impl fmt::Display for ReceiptPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// =============================================================================
// Period Key
// =============================================================================

/// The financial-year bucket a date falls into, as the 2-digit token used in
/// receipt numbers. In this system the financial year is the calendar year.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use volta_core::receipt::period_key;
///
/// let date = NaiveDate::from_ymd_opt(2026, 8, 21).unwrap();
/// assert_eq!(period_key(date), "26");
/// ```
pub fn period_key(date: NaiveDate) -> String {
    format!("{:02}", date.year() % 100)
}

// =============================================================================
// Receipt Number Formatting
// =============================================================================

/// Formats a receipt number from its parts.
///
/// Sequences render with at least 4 digits; a year that somehow exceeds 9999
/// receipts just grows wider rather than wrapping.
///
/// ## Example
/// ```rust
/// use volta_core::receipt::{format_receipt_number, ReceiptPrefix};
///
/// assert_eq!(
///     format_receipt_number(ReceiptPrefix::Order, "26", 42),
///     "ORD/26/0042"
/// );
/// assert_eq!(
///     format_receipt_number(ReceiptPrefix::CounterSale, "26", 7),
///     "SS/26/0007"
/// );
/// ```
pub fn format_receipt_number(prefix: ReceiptPrefix, financial_year: &str, sequence: i64) -> String {
    format!("{}/{}/{:04}", prefix.token(), financial_year, sequence)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_key() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();

        assert_eq!(period_key(d(2026, 8, 21)), "26");
        assert_eq!(period_key(d(2025, 1, 1)), "25");
        // Two-digit padding holds at the turn of a century
        assert_eq!(period_key(d(2100, 6, 15)), "00");
        assert_eq!(period_key(d(2109, 6, 15)), "09");
    }

    #[test]
    fn test_format_receipt_number() {
        assert_eq!(
            format_receipt_number(ReceiptPrefix::Order, "26", 1),
            "ORD/26/0001"
        );
        assert_eq!(
            format_receipt_number(ReceiptPrefix::Order, "26", 9999),
            "ORD/26/9999"
        );
        assert_eq!(
            format_receipt_number(ReceiptPrefix::CounterSale, "25", 123),
            "SS/25/0123"
        );
    }

    #[test]
    fn test_sequence_wider_than_four_digits() {
        assert_eq!(
            format_receipt_number(ReceiptPrefix::Order, "26", 12345),
            "ORD/26/12345"
        );
    }

    #[test]
    fn test_prefix_tokens() {
        assert_eq!(ReceiptPrefix::Order.token(), "ORD");
        assert_eq!(ReceiptPrefix::CounterSale.token(), "SS");
        assert_eq!(ReceiptPrefix::Order.to_string(), "ORD");
    }
}

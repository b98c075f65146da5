//! # Validation Module
//!
//! Input validation utilities for Volta Commerce.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (TypeScript)                                        │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Service call (Rust)                                          │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (ledger dates, receipt sequences)              │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use volta_core::validation::{validate_phone, sales_split};
//!
//! // Validate contact details before creating a customer
//! validate_phone("9876543210").unwrap();
//!
//! // Derive the cash/subtotal split for a DailySales row
//! let split = sales_split(1_000_000, 600_000).unwrap();
//! assert_eq!(split.cash_paise, 400_000);
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use volta_core::validation::validate_sku;
///
/// assert!(validate_sku("FAN-CEIL-48").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    // Check for valid characters (alphanumeric, hyphen, underscore)
    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an Indian mobile number.
///
/// ## Rules
/// - Exactly 10 digits after trimming
/// - First digit 6-9 (mobile ranges)
///
/// ## Example
/// ```rust
/// use volta_core::validation::validate_phone;
///
/// assert!(validate_phone("9876543210").is_ok());
/// assert!(validate_phone("12345").is_err());
/// assert!(validate_phone("0123456789").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be exactly 10 digits".to_string(),
        });
    }

    if !matches!(phone.chars().next(), Some('6'..='9')) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must start with 6, 7, 8 or 9".to_string(),
        });
    }

    Ok(())
}

/// Validates an Indian postal code.
///
/// ## Rules
/// - Exactly 6 digits
/// - First digit non-zero
pub fn validate_pincode(pincode: &str) -> ValidationResult<()> {
    let pincode = pincode.trim();

    if pincode.is_empty() {
        return Err(ValidationError::Required {
            field: "pincode".to_string(),
        });
    }

    if pincode.len() != 6
        || !pincode.chars().all(|c| c.is_ascii_digit())
        || pincode.starts_with('0')
    {
        return Err(ValidationError::InvalidFormat {
            field: "pincode".to_string(),
            reason: "must be a 6-digit postal code".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Checkout: Add Item                                                     │
/// │                                                                         │
/// │  User enters quantity: 5                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → Proceed with place_order                                │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in paise.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, zero-charge quotes)
pub fn validate_price_paise(paise: i64) -> ValidationResult<()> {
    if paise < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a named monetary amount in paise (ledger fields, charges).
pub fn validate_amount_paise(field: &str, paise: i64) -> ValidationResult<()> {
    if paise < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates order size (number of distinct line items).
///
/// ## Rules
/// - Must have at least one item
/// - Must not exceed MAX_ORDER_ITEMS (100)
pub fn validate_order_size(item_count: usize) -> ValidationResult<()> {
    if item_count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if item_count > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Ledger Derivations
// =============================================================================

/// The derived portions of a DailySales row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesSplit {
    /// total − online; never negative.
    pub cash_paise: i64,
    /// online + cash; always equals the total.
    pub subtotal_paise: i64,
}

/// Derives the cash/subtotal split for a DailySales row.
///
/// ## Rules
/// - Both amounts non-negative
/// - `online_received ≤ total_sales` (the split would otherwise go negative)
///
/// ## Example
/// ```rust
/// use volta_core::validation::sales_split;
///
/// let split = sales_split(1_000_000, 600_000).unwrap();
/// assert_eq!(split.cash_paise, 400_000);
/// assert_eq!(split.subtotal_paise, 1_000_000);
///
/// assert!(sales_split(500_000, 600_000).is_err());
/// ```
pub fn sales_split(total_paise: i64, online_paise: i64) -> ValidationResult<SalesSplit> {
    validate_amount_paise("total_sales", total_paise)?;
    validate_amount_paise("online_received", online_paise)?;

    if online_paise > total_paise {
        return Err(ValidationError::OnlineExceedsTotal {
            online: online_paise,
            total: total_paise,
        });
    }

    let cash_paise = total_paise - online_paise;
    Ok(SalesSplit {
        cash_paise,
        subtotal_paise: online_paise + cash_paise,
    })
}

/// Derives the total for a DailyExpenditure row.
/// NULL sub-amounts are treated as 0.
pub fn expenditure_total(
    online_paise: Option<i64>,
    cash_paise: Option<i64>,
) -> ValidationResult<i64> {
    let online = online_paise.unwrap_or(0);
    let cash = cash_paise.unwrap_or(0);

    validate_amount_paise("online_amount", online)?;
    validate_amount_paise("cash_amount", cash)?;

    Ok(online + cash)
}

/// Checks the monetary fields of a walk-in receipt.
///
/// ## Rules
/// - subtotal / tax / discount non-negative
/// - `grand_total == subtotal + tax − discount`, and never negative
pub fn validate_receipt_totals(
    subtotal_paise: i64,
    tax_paise: i64,
    discount_paise: i64,
    grand_total_paise: i64,
) -> ValidationResult<()> {
    validate_amount_paise("subtotal", subtotal_paise)?;
    validate_amount_paise("tax_amount", tax_paise)?;
    validate_amount_paise("discount_amount", discount_paise)?;

    let expected = subtotal_paise + tax_paise - discount_paise;
    if expected < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "grand_total".to_string(),
        });
    }

    if grand_total_paise != expected {
        return Err(ValidationError::GrandTotalMismatch {
            given: grand_total_paise,
            expected,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Rules
/// - Must be a valid UUID v4 format
/// - 36 characters with hyphens: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
///
/// ## Example
/// ```rust
/// use volta_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    // Try to parse as UUID
    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        // Valid SKUs
        assert!(validate_sku("FAN-CEIL-48").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        // Invalid SKUs
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Havells Ceiling Fan 1200mm").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("6000000000").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("98765").is_err());
        assert!(validate_phone("98765432101").is_err());
        assert!(validate_phone("987654321a").is_err());
        assert!(validate_phone("1876543210").is_err());
    }

    #[test]
    fn test_validate_pincode() {
        assert!(validate_pincode("452001").is_ok());
        assert!(validate_pincode("110001").is_ok());

        assert!(validate_pincode("").is_err());
        assert!(validate_pincode("4520").is_err());
        assert!(validate_pincode("045201").is_err());
        assert!(validate_pincode("45200a").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_paise() {
        assert!(validate_price_paise(0).is_ok());
        assert!(validate_price_paise(1099).is_ok());
        assert!(validate_price_paise(-100).is_err());
    }

    #[test]
    fn test_sales_split() {
        let split = sales_split(1_000_000, 600_000).unwrap();
        assert_eq!(split.cash_paise, 400_000);
        assert_eq!(split.subtotal_paise, 1_000_000);

        // All-cash day
        let split = sales_split(1_000_000, 0).unwrap();
        assert_eq!(split.cash_paise, 1_000_000);

        // All-online day
        let split = sales_split(1_000_000, 1_000_000).unwrap();
        assert_eq!(split.cash_paise, 0);
        assert_eq!(split.subtotal_paise, 1_000_000);
    }

    #[test]
    fn test_sales_split_rejects_online_over_total() {
        let err = sales_split(500_000, 600_000).unwrap_err();
        assert!(matches!(err, ValidationError::OnlineExceedsTotal { .. }));
    }

    #[test]
    fn test_sales_split_rejects_negative() {
        assert!(sales_split(-1, 0).is_err());
        assert!(sales_split(100, -1).is_err());
    }

    #[test]
    fn test_expenditure_total_treats_null_as_zero() {
        assert_eq!(expenditure_total(Some(300), Some(200)).unwrap(), 500);
        assert_eq!(expenditure_total(None, Some(200)).unwrap(), 200);
        assert_eq!(expenditure_total(Some(300), None).unwrap(), 300);
        assert_eq!(expenditure_total(None, None).unwrap(), 0);

        assert!(expenditure_total(Some(-5), None).is_err());
    }

    #[test]
    fn test_validate_receipt_totals() {
        assert!(validate_receipt_totals(10000, 1800, 0, 11800).is_ok());
        assert!(validate_receipt_totals(10000, 1800, 800, 11000).is_ok());

        // Wrong arithmetic
        let err = validate_receipt_totals(10000, 1800, 0, 12000).unwrap_err();
        assert!(matches!(err, ValidationError::GrandTotalMismatch { .. }));

        // Discount larger than the receipt
        assert!(validate_receipt_totals(100, 0, 500, -400).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
        assert!(validate_uuid("123").is_err());
    }

    #[test]
    fn test_validate_order_size() {
        assert!(validate_order_size(1).is_ok());
        assert!(validate_order_size(100).is_ok());
        assert!(validate_order_size(0).is_err());
        assert!(validate_order_size(101).is_err());
    }
}

//! # Error Types
//!
//! Domain-specific error types for volta-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  volta-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule / state machine errors           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  volta-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  volta-engine errors (separate crate)                                  │
//! │  └── EngineError      - What the host web layer sees                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → EngineError → Host      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (receipt number, order id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message
//!
//! ## Taxonomy mapping
//! The four caller-visible classes are: validation (rejected before any
//! mutation), conflict (lost a uniqueness race, one bounded retry), state
//! (transition refused, entity untouched) and external-service (logged,
//! degraded, never fatal). Core owns the first and third; conflicts live in
//! volta-db, external failures in volta-engine.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in database
    /// - Product was deactivated (soft delete)
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a standard checkout.
    ///
    /// ## When This Occurs
    /// - A standard (non-enquiry) order requests more than available stock;
    ///   that path deducts immediately, so the shortfall blocks checkout.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "FAN-CEIL-48", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 FAN-CEIL-48 in stock"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Appointment not found.
    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),

    /// The entity is not in a state that allows the requested transition.
    ///
    /// ## When This Occurs
    /// - Confirming an already-confirmed order
    /// - Delivering an order that is not out for delivery
    /// - Cancelling a terminal order, or a Confirmed one as a customer
    /// - Voiding a voided receipt, correcting a corrected one
    #[error("{entity} {id} is {current}, cannot {attempted}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        current: String,
        attempted: String,
    },

    /// Delivery OTP did not match the stored value.
    /// The order is left untouched; the caller may retry with the right code.
    #[error("Delivery OTP mismatch for order {order_id}")]
    OtpMismatch { order_id: String },

    /// Order has exceeded maximum allowed items.
    #[error("Order cannot have more than {max} items")]
    OrderTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs - a validation
/// failure means nothing was mutated.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., bad phone number, bad pincode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Online portion cannot exceed the day's total takings.
    #[error("online_received ({online}) exceeds total_sales ({total})")]
    OnlineExceedsTotal { online: i64, total: i64 },

    /// Grand total must equal subtotal + tax − discount.
    #[error("grand_total {given} does not match subtotal + tax - discount ({expected})")]
    GrandTotalMismatch { given: i64, expected: i64 },

    /// Duplicate value (e.g., second ledger row for the same date).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # volta-core: Pure Business Logic for Volta Commerce
//!
//! This crate is the **heart** of the Volta Commerce backend. It contains all
//! business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Volta Commerce Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Host Web Layer (external)                       │   │
//! │  │    Storefront ──► Checkout ──► Admin Back Office ──► Reports   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ service calls                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    volta-engine (Services)                      │   │
//! │  │    place_order, confirm_order, book_appointment, profit_loss   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ volta-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │  receipt  │  │   │
//! │  │   │   Order   │  │   Money   │  │ DeliveryQ │  │ ORD/26/…  │  │   │
//! │  │   │ Appointmt │  │  (paise)  │  │ VisitingQ │  │ sequences │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │ analytics │  │ validation│                                 │   │
//! │  │   │ pct/growth│  │   rules   │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    volta-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Appointment, ledger rows, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Delivery tiers, free-delivery rule, visiting-charge brackets
//! - [`receipt`] - Financial-year period keys and receipt number formatting
//! - [`analytics`] - Division-safe percentage and growth math for reporting
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in paise (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use volta_core::money::Money;
//! use volta_core::pricing::{delivery_charge, DeliveryQuote};
//!
//! // Create money from paise (never from floats!)
//! let total = Money::from_rupees(500); // ₹500.00
//!
//! // A 4.0 km delivery falls into the ₹70 tier
//! match delivery_charge(4.0) {
//!     DeliveryQuote::Tiered(charge) => assert_eq!(charge, Money::from_rupees(70)),
//!     DeliveryQuote::OutOfRange => unreachable!(),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod money;
pub mod pricing;
pub mod receipt;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use volta_core::Money` instead of
// `use volta_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum items allowed in a single order
///
/// ## Business Reason
/// Prevents runaway checkouts and ensures reasonable transaction sizes.
/// Can be made configurable in future versions.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single item in an order
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default free-delivery distance ceiling in kilometres
///
/// The legacy system applied free delivery below 3 km on one path and below
/// 2 km on another. Unified here; hosts override via `PricingConfig`.
pub const DEFAULT_FREE_DELIVERY_MAX_KM: f64 = 3.0;

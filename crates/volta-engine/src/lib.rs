//! # volta-engine: Service Layer for Volta Commerce
//!
//! Every operation the storefront and the admin back office invoke lives
//! here: checkout, order fulfillment, appointment booking, counter receipts,
//! ledger entry, financial reporting and the notification dispatcher.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Volta Commerce Stack                             │
//! │                                                                         │
//! │  Host web layer (HTTP, auth, rendering)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   volta-engine (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │  CheckoutService      FulfillmentService     BookingService    │   │
//! │  │  ReceiptService       LedgerService          ReportingEngine   │   │
//! │  │  OutboxDispatcher                                               │   │
//! │  │                                                                 │   │
//! │  │  Collaborator traits the host implements:                       │   │
//! │  │    DistanceResolver (geocoding)   Notifier (SMS/email gateway) │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                          │                                      │
//! │       ▼                          ▼                                      │
//! │  volta-core (pure rules)    volta-db (SQLite)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactional discipline
//!
//! Every state transition commits atomically with its side effects: pricing
//! locks, stock movements, receipt-number assignment, the activity entry and
//! the queued notification all ride the same transaction. External I/O
//! (geocoding, notification delivery) happens strictly outside transactions
//! and its failures degrade instead of blocking commerce.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod booking;
pub mod checkout;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod fulfillment;
pub mod geocode;
pub mod guard;
pub mod ledger;
pub mod notify;
pub mod receipts;
pub mod reporting;

// =============================================================================
// Re-exports
// =============================================================================

pub use booking::{BookAppointmentRequest, BookingService};
pub use checkout::{CheckoutService, OrderItemRequest, PlaceOrderRequest};
pub use config::{ConfigError, EngineConfig};
pub use context::AuditContext;
pub use dispatch::{DispatchStats, DispatcherHandle, OutboxDispatcher};
pub use error::{EngineError, EngineResult};
pub use fulfillment::FulfillmentService;
pub use geocode::{DistanceResolver, FixedDistanceResolver, ResolveError, ResolvedDistance};
pub use guard::FinancialGuard;
pub use ledger::LedgerService;
pub use notify::{NotificationEvent, Notifier, NotifyError};
pub use receipts::{IssueReceiptRequest, ReceiptService};
pub use reporting::{Insights, ReportingEngine};

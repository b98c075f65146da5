//! # volta-db: Database Layer for Volta Commerce
//!
//! This crate provides database access for the Volta Commerce backend.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Volta Commerce Data Flow                            │
//! │                                                                         │
//! │  volta-engine service call (confirm_order, profit_loss, ...)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     volta-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (order.rs,   │    │  (embedded)  │  │   │
//! │  │   │               │    │   ledger.rs)  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_init.sql │  │   │
//! │  │   │ Transactions  │    │ LedgerRepo    │    │ 002_ledgers  │  │   │
//! │  │   │               │    │ ...           │    │ 003_outbox   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL mode, foreign keys ON)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactional helper pattern
//!
//! Repositories come in two shapes:
//! - pool-holding structs for standalone reads/writes
//!   (`db.orders().get_by_id(...)`)
//! - associated functions taking `&mut SqliteConnection` for operations that
//!   MUST share a transaction with other writes (stock deduction, receipt
//!   sequence allocation, outbox enqueue, audit entries). volta-engine opens
//!   the transaction and threads the connection through.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use volta_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("volta.db")).await?;
//! let order = db.orders().get_by_id("uuid-here").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::appointment::AppointmentRepository;
pub use repository::audit::AuditRepository;
pub use repository::customer::CustomerRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::order::OrderRepository;
pub use repository::outbox::NotificationOutboxRepository;
pub use repository::product::ProductRepository;
pub use repository::receipt::OfflineReceiptRepository;
pub use repository::service::{ElectricianRepository, ServiceTypeRepository};

//! # Repository Module
//!
//! Database repository implementations for Volta Commerce.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  volta-engine service                                                  │
//! │       │                                                                 │
//! │       │  db.orders().get_by_id(id)                                     │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── get_by_id(&self, id)           ← pool-backed reads                │
//! │  ├── insert(&self, order, items)                                       │
//! │  └── fetch_for_update(conn, id)     ← &mut SqliteConnection helpers    │
//! │       │                               for transactional writes         │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  The `&mut SqliteConnection` associated functions exist because the    │
//! │  order state machine must do several writes (status, stock, sequence,  │
//! │  outbox, audit) in ONE transaction. volta-engine owns the transaction; │
//! │  the repositories own the SQL.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customers + the free-delivery counter
//! - [`product::ProductRepository`] - Catalog CRUD and guarded stock updates
//! - [`order::OrderRepository`] - Orders, items, receipt sequence allocation
//! - [`service::ServiceTypeRepository`] / [`service::ElectricianRepository`]
//! - [`appointment::AppointmentRepository`] - Service bookings
//! - [`ledger::LedgerRepository`] - The three financial ledgers + aggregation SQL
//! - [`receipt::OfflineReceiptRepository`] - Walk-in receipts (SS sequence)
//! - [`outbox::NotificationOutboxRepository`] - Transactional notification queue
//! - [`audit::AuditRepository`] - Activity log + financial guard log

pub mod appointment;
pub mod audit;
pub mod customer;
pub mod ledger;
pub mod order;
pub mod outbox;
pub mod product;
pub mod receipt;
pub mod service;

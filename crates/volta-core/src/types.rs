//! # Domain Types
//!
//! Core domain types used throughout Volta Commerce.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   Appointment   │   │ OfflineReceipt  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  receipt_number │   │  service_type   │   │  receipt_number │       │
//! │  │  status         │   │  status         │   │  status         │       │
//! │  │  final_price    │   │  visiting_chrg  │   │  grand_total    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   DailySales    │   │ DailyExpenditure│   │  PurchaseEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  one per date   │   │  one per date   │   │  per supplier   │       │
//! │  │  cash derived   │   │  total derived  │   │  total_cost     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │         the ONLY inputs to financial reporting (ledger rows)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, receipt_number, etc.) - human-readable, assigned by
//!   business rules (receipt numbers only appear once an order is confirmed)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Actor Role
// =============================================================================

/// Who is driving a mutation. The order state machine distinguishes
/// customer-initiated cancellation (Pending only) from admin actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Back-office staff; may drive any permitted transition.
    Admin,
    /// Storefront customer; may only cancel their own Pending orders.
    Customer,
    /// Background jobs (outbox dispatcher, seeders).
    System,
}

// =============================================================================
// Customer
// =============================================================================

/// A storefront customer account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// 10-digit mobile number - business identifier, unique.
    pub phone: String,

    /// Optional email for notifications.
    pub email: Option<String>,

    /// Default delivery address.
    pub address: String,

    /// 6-digit postal code.
    pub pincode: String,

    /// Lifetime free-delivery uses. Starts at 0, bumped to 1 when the one
    /// free delivery is claimed, never decremented (not even on cancel).
    pub free_delivery_used_count: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Whether this customer still has their lifetime free delivery available.
    #[inline]
    pub fn free_delivery_available(&self) -> bool {
        self.free_delivery_used_count == 0
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product (fans, wiring, switches, fixtures...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown on the storefront and on receipts.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Catalog category label.
    pub category: Option<String>,

    /// Price in paise (smallest currency unit).
    pub price_paise: i64,

    /// Current stock level. A single mutable counter; every change rides the
    /// same transaction as the order write that caused it.
    pub stock_quantity: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }

    /// Checks whether current stock covers the requested quantity.
    #[inline]
    pub fn in_stock(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The fulfillment status of an order.
///
/// ```text
/// Pending ──► Confirmed ──► OutForDelivery ──► Delivered
///    │             │               │
///    └─────────────┴───────────────┴──────────► Cancelled
/// ```
/// Delivered and Cancelled are terminal. Customers may only cancel from
/// Pending; admins may cancel from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed at checkout, awaiting admin confirmation.
    Pending,
    /// Admin confirmed; pricing locked, receipt assigned.
    Confirmed,
    /// Handed to the rider; delivery OTP issued.
    OutForDelivery,
    /// Customer presented the correct OTP.
    Delivered,
    /// Cancelled by customer (from Pending) or admin.
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transitions are permitted out of this status.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The explicit transition table.
    ///
    /// The legacy system left admin cancellation unconstrained; here the
    /// full table is spelled out and enforced at every transition.
    pub fn can_become(&self, next: OrderStatus, role: ActorRole) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Confirmed) => true,
            (Confirmed, OutForDelivery) => true,
            (OutForDelivery, Delivered) => true,
            (Pending, Cancelled) => true,
            (Confirmed | OutForDelivery, Cancelled) => {
                matches!(role, ActorRole::Admin | ActorRole::System)
            }
            _ => false,
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{label}")
    }
}

// =============================================================================
// Order Type
// =============================================================================

/// Selects the stock-deduction path at checkout.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Priced at checkout; stock deducted immediately.
    Standard,
    /// Prices not final at checkout; stock deduction and pricing are
    /// deferred to admin confirmation so enquiries never reserve stock.
    Enquiry,
}

impl Default for OrderType {
    fn default() -> Self {
        OrderType::Standard
    }
}

// =============================================================================
// Delivery Charge Status
// =============================================================================

/// Whether the delivery charge on an order is still an estimate.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChargeStatus {
    /// Computed automatically at checkout; may be revised by admin.
    Estimated,
    /// Locked in by admin at order confirmation.
    Confirmed,
}

impl Default for DeliveryChargeStatus {
    fn default() -> Self {
        DeliveryChargeStatus::Estimated
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order placed through checkout.
///
/// ## Money invariants
/// - `total_price_paise` is the sum of item snapshots, immutable once items
///   exist (re-snapshotted only when an Enquiry order is confirmed).
/// - `final_price_paise` stays NULL while Pending; once set it equals
///   `total_price + delivery_charge`, or `total_price` alone when free
///   delivery zeroed the charge.
/// - `receipt_number` is assigned exactly once, the first time status
///   reaches Confirmed / OutForDelivery / Delivered, and never reassigned.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning customer.
    pub customer_id: String,

    /// Standard (priced) vs enquiry (price-on-confirmation).
    pub order_type: OrderType,

    /// Fulfillment status; transitions governed by [`OrderStatus::can_become`].
    pub status: OrderStatus,

    /// Delivery address text as entered at checkout.
    pub delivery_address: String,

    /// Road distance to the customer in km. 0.0 means unknown (geocoding
    /// failed or address unresolvable) - pricing treats it as out of range.
    pub distance_km: f64,

    /// Sum of item price snapshots in paise.
    pub total_price_paise: i64,

    /// Delivery charge in paise; mutable until confirmation.
    pub delivery_charge_paise: i64,

    /// Estimate vs locked-in marker for the delivery charge.
    pub delivery_charge_status: DeliveryChargeStatus,

    /// Total + delivery, set at admin confirmation. NULL while Pending.
    pub final_price_paise: Option<i64>,

    /// True when this order consumed the customer's one free delivery.
    pub free_delivery_applied: bool,

    /// True once stock has been deducted for this order (either path).
    /// Cancellation restores stock only when this is set, then clears it.
    pub stock_deducted: bool,

    /// 6-digit delivery OTP, present from OutForDelivery onwards.
    pub delivery_otp: Option<String>,

    /// Human-facing receipt number, `ORD/YY/NNNN`. NULL until first assigned.
    pub receipt_number: Option<String>,

    /// 2-digit financial-year key the sequence below is scoped to.
    pub financial_year: Option<String>,

    /// Per-financial-year sequence; unique within the year, gap-free.
    pub receipt_sequence: Option<i64>,

    /// Why the order was cancelled, when it was.
    pub cancellation_reason: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the item total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_paise(self.total_price_paise)
    }

    /// Returns the delivery charge as Money.
    #[inline]
    pub fn delivery_charge(&self) -> Money {
        Money::from_paise(self.delivery_charge_paise)
    }

    /// Returns the final price, if confirmation has set one.
    #[inline]
    pub fn final_price(&self) -> Option<Money> {
        self.final_price_paise.map(Money::from_paise)
    }

    /// Whether a receipt number has been assigned yet.
    #[inline]
    pub fn has_receipt(&self) -> bool {
        self.receipt_number.is_some()
    }

    /// Whether the delivery distance is known.
    #[inline]
    pub fn has_known_distance(&self) -> bool {
        self.distance_km > 0.0
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
/// Uses snapshot pattern to freeze product data at order time - the price a
/// customer saw is the price they pay, regardless of later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// SKU at order time (frozen).
    pub sku_snapshot: String,
    /// Product name at order time (frozen).
    pub name_snapshot: String,
    /// Unit price in paise at order time (frozen; refreshed once for
    /// enquiry orders when the admin confirms pricing).
    pub unit_price_paise: i64,
    /// Quantity ordered.
    pub quantity: i64,
    /// Line total (unit_price × quantity).
    pub line_total_paise: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_paise(self.line_total_paise)
    }
}

// =============================================================================
// Service Type
// =============================================================================

/// An electrician service offered for appointment booking (fan installation,
/// wiring check, inverter service...).
///
/// Visiting-charge pricing is either a flat default or distance brackets.
/// Bracket columns are upper bounds in metres/km: a 2.4 km visit priced by
/// brackets uses `charge_upto_3km_paise` (the tightest covering bracket).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ServiceType {
    pub id: String,
    /// Unique service name.
    pub name: String,
    pub description: Option<String>,
    /// Flat visiting charge used when no brackets are configured.
    pub base_visiting_charge_paise: Option<i64>,
    pub charge_upto_500m_paise: Option<i64>,
    pub charge_upto_1km_paise: Option<i64>,
    pub charge_upto_3km_paise: Option<i64>,
    pub charge_upto_5km_paise: Option<i64>,
    pub charge_upto_7km_paise: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ServiceType {
    /// Distance brackets as (upper bound km, configured charge) pairs,
    /// tightest first. Pricing scans this in order.
    pub fn brackets(&self) -> [(f64, Option<i64>); 5] {
        [
            (0.5, self.charge_upto_500m_paise),
            (1.0, self.charge_upto_1km_paise),
            (3.0, self.charge_upto_3km_paise),
            (5.0, self.charge_upto_5km_paise),
            (7.0, self.charge_upto_7km_paise),
        ]
    }

    /// Whether any distance bracket is configured.
    pub fn has_brackets(&self) -> bool {
        self.brackets().iter().any(|(_, charge)| charge.is_some())
    }
}

// =============================================================================
// Electrician
// =============================================================================

/// A field electrician who can be assigned to appointments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Electrician {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Appointment Status
// =============================================================================

/// The lifecycle of a service appointment.
///
/// ```text
/// Pending ──► Approved ──► Completed
///    │            │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Whether no further transitions are permitted out of this status.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// The explicit transition table.
    pub fn can_become(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Approved, Completed) | (Pending | Approved, Cancelled)
        )
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Pending
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Approved => "Approved",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        };
        write!(f, "{label}")
    }
}

// =============================================================================
// Appointment
// =============================================================================

/// A booked electrician visit. Fully independent of Order: no stock, no OTP,
/// no receipt numbering.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Appointment {
    pub id: String,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub service_type_id: String,
    /// Requested visit date.
    #[ts(as = "String")]
    pub scheduled_date: NaiveDate,
    /// Requested time slot label, e.g. "10:00-12:00".
    pub scheduled_slot: String,
    /// Distance to the customer in km; 0.0 = unknown.
    pub distance_km: f64,
    /// Computed once at creation from the service type's pricing rules.
    /// NULL = needs admin confirmation (out of bracket range or unpriced).
    pub visiting_charge_paise: Option<i64>,
    /// Admin-added extras (parts, additional labor). Defaults to 0.
    pub extra_charge_paise: i64,
    pub status: AppointmentStatus,
    /// Assigned field electrician; changeable until Completed.
    pub assigned_electrician_id: Option<String>,
    pub cancellation_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Returns the visiting charge, if one has been set.
    #[inline]
    pub fn visiting_charge(&self) -> Option<Money> {
        self.visiting_charge_paise.map(Money::from_paise)
    }

    /// Returns the extra charge as Money.
    #[inline]
    pub fn extra_charge(&self) -> Money {
        Money::from_paise(self.extra_charge_paise)
    }

    /// Total charge = visiting + extra. None while the visiting charge still
    /// needs admin confirmation.
    pub fn total_charge(&self) -> Option<Money> {
        self.visiting_charge().map(|v| v + self.extra_charge())
    }
}

// =============================================================================
// Ledger Rows
// =============================================================================
// DailySales / DailyExpenditure / PurchaseEntry are manually entered by the
// back office. They have NO foreign keys to Order or Appointment - financial
// reporting reads these three tables and nothing else.

/// One bookkeeping row per calendar date of shop takings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailySales {
    pub id: String,
    /// Unique per calendar date.
    #[ts(as = "String")]
    pub entry_date: NaiveDate,
    pub total_sales_paise: i64,
    pub online_received_paise: i64,
    /// Derived: total − online. Never negative (online ≤ total is validated).
    pub cash_received_paise: i64,
    /// Optional, excluded from subtotal.
    pub labor_charge_paise: Option<i64>,
    /// Optional, excluded from subtotal.
    pub delivery_charge_paise: Option<i64>,
    /// Derived: online + cash, i.e. equals total_sales.
    pub subtotal_paise: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One bookkeeping row per calendar date of shop spending.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailyExpenditure {
    pub id: String,
    #[ts(as = "String")]
    pub entry_date: NaiveDate,
    pub online_amount_paise: Option<i64>,
    pub cash_amount_paise: Option<i64>,
    /// Derived: online + cash with NULL parts treated as 0.
    pub total_paise: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A stock purchase from a supplier. Several per day are normal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseEntry {
    pub id: String,
    #[ts(as = "String")]
    pub entry_date: NaiveDate,
    pub supplier_name: String,
    pub description: Option<String>,
    pub total_cost_paise: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Offline Receipt
// =============================================================================

/// Lifecycle of a walk-in counter receipt.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OfflineReceiptStatus {
    /// Normal, countable receipt.
    Active,
    /// Struck out; kept for the audit trail. Cannot be voided again.
    Void,
    /// Superseded by a correction receipt. Cannot be edited or corrected
    /// again - at most one correction per receipt.
    Corrected,
}

impl Default for OfflineReceiptStatus {
    fn default() -> Self {
        OfflineReceiptStatus::Active
    }
}

/// A walk-in counter sale receipt, numbered `SS/YY/NNNN` independently of
/// online orders. Wholly isolated from DailySales and Order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OfflineReceipt {
    pub id: String,
    pub receipt_number: String,
    /// 2-digit financial-year key.
    pub financial_year: String,
    /// Unique within the financial year, gap-free.
    pub sequence_number: i64,
    pub customer_name: Option<String>,
    pub status: OfflineReceiptStatus,
    pub subtotal_paise: i64,
    pub tax_amount_paise: i64,
    pub discount_amount_paise: i64,
    /// subtotal + tax − discount.
    pub grand_total_paise: i64,
    /// Set on the replacement receipt: which receipt it corrects.
    pub original_receipt_id: Option<String>,
    /// Set on the corrected receipt: which receipt replaced it.
    pub corrected_by_receipt_id: Option<String>,
    pub void_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl OfflineReceipt {
    /// Returns the grand total as Money.
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }

    /// Whether this receipt can still be voided.
    #[inline]
    pub fn can_void(&self) -> bool {
        self.status == OfflineReceiptStatus::Active
    }

    /// Whether this receipt can still be corrected.
    #[inline]
    pub fn can_correct(&self) -> bool {
        self.status == OfflineReceiptStatus::Active && self.corrected_by_receipt_id.is_none()
    }
}

// =============================================================================
// Notification Outbox
// =============================================================================

/// Event kinds the core emits towards the notification collaborator.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationEventType {
    OrderConfirmed,
    DeliveryOtpIssued,
    OrderDelivered,
    OrderCancelled,
    AppointmentStatusChanged,
    AppointmentCompleted,
    ElectricianAssigned,
}

/// Delivery state of an outbox row.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

/// An entry in the notification outbox queue.
///
/// Written in the SAME transaction as the state change that triggered it, so
/// a committed transition always has its notifications queued and a rolled
/// back one never does. A background dispatcher drains the queue best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct NotificationOutboxEntry {
    pub id: String,
    pub event_type: NotificationEventType,
    /// Phone number or email of the recipient.
    pub recipient: String,
    /// Event context as JSON (order id, OTP, charges...).
    pub payload: String,
    pub status: NotificationStatus,
    /// Number of dispatch attempts.
    pub attempts: i64,
    /// Last error message if dispatch failed.
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// When dispatch was last attempted.
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    /// When successfully sent.
    #[ts(as = "Option<String>")]
    pub sent_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Audit Trail
// =============================================================================

/// An explicit audit entry written by the mutation that it describes,
/// inside the same transaction (no implicit hooks).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ActivityLogEntry {
    pub id: String,
    /// Acting user (admin name, customer phone, or "system").
    pub actor: String,
    pub ip_address: Option<String>,
    /// Verb, e.g. "order.confirm", "receipt.void".
    pub action: String,
    /// Entity kind, e.g. "order", "appointment".
    pub entity: String,
    pub entity_id: Option<String>,
    pub details: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A recorded attempt to derive financial figures from operational data.
/// Reporting must only read ledger rows; any violation attempt lands here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FinancialGuardLogEntry {
    pub id: String,
    /// Component that attempted the read, e.g. "reporting".
    pub source: String,
    pub attempted_action: String,
    pub details: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

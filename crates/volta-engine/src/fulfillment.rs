//! # Order Fulfillment Service
//!
//! Drives the order state machine. Every transition runs in a single
//! transaction: the status change, its pricing/stock side effects, the
//! activity entry and the queued notification commit together or not at all.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pending ──confirm──► Confirmed ──dispatch──► OutForDelivery            │
//! │     │                     │                        │                    │
//! │     │                     │                     deliver (OTP)           │
//! │     │                     │                        │                    │
//! │     │                     ▼                        ▼                    │
//! │     └──cancel──────► Cancelled ◄──cancel───   Delivered                 │
//! │        (customer:          (admin only             (terminal)           │
//! │         Pending only)       past Pending)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The receipt number is assigned the first time an order reaches Confirmed,
//! OutForDelivery or Delivered, never earlier and never twice. Cancelling a
//! numbered order keeps its number; the sequence never reuses it.

use chrono::Utc;
use rand::Rng;
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use volta_core::pricing::{delivery_charge, final_price, free_delivery_eligible};
use volta_core::receipt::{format_receipt_number, period_key, ReceiptPrefix};
use volta_core::{
    CoreError, Money, NotificationEventType, Order, OrderStatus, OrderType,
};
use volta_db::repository::audit::AuditRepository;
use volta_db::repository::customer::CustomerRepository;
use volta_db::repository::order::OrderRepository;
use volta_db::repository::outbox::NotificationOutboxRepository;
use volta_db::repository::product::ProductRepository;
use volta_db::Database;

use crate::config::EngineConfig;
use crate::context::AuditContext;
use crate::error::{EngineError, EngineResult};
use crate::notify::outbox_entry;

/// Drives order status transitions.
#[derive(Clone)]
pub struct FulfillmentService {
    db: Database,
    config: EngineConfig,
}

impl FulfillmentService {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        FulfillmentService { db, config }
    }

    // =========================================================================
    // Confirm
    // =========================================================================

    /// Confirms a Pending order: locks pricing, applies the free-delivery
    /// benefit if earned, assigns the receipt number, queues the confirmation
    /// notification.
    ///
    /// `distance_override` lets the admin correct a distance the geocoder got
    /// wrong (or never produced) before pricing locks in.
    ///
    /// A lost receipt-sequence race is replayed once; a second loss surfaces
    /// as a conflict.
    pub async fn confirm_order(
        &self,
        ctx: &AuditContext,
        order_id: &str,
        distance_override: Option<f64>,
    ) -> EngineResult<Order> {
        match self.try_confirm(ctx, order_id, distance_override).await {
            Err(err) if err.is_conflict() => {
                debug!(%order_id, "Lost receipt sequence race, replaying confirmation");
                self.try_confirm(ctx, order_id, distance_override).await
            }
            other => other,
        }
    }

    async fn try_confirm(
        &self,
        ctx: &AuditContext,
        order_id: &str,
        distance_override: Option<f64>,
    ) -> EngineResult<Order> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let order = OrderRepository::fetch_for_update(tx.as_mut(), order_id).await?;
        check_transition(&order, OrderStatus::Confirmed, ctx)?;

        let distance_km = match distance_override {
            Some(km) => {
                OrderRepository::set_distance(tx.as_mut(), order_id, km).await?;
                km
            }
            None => order.distance_km,
        };

        // Enquiry orders were never priced or stocked at checkout; both
        // happen now, against the current catalog.
        let total = if order.order_type == OrderType::Enquiry {
            self.reprice_and_stock_enquiry(tx.as_mut(), &order).await?
        } else {
            Money::from_paise(order.total_price_paise)
        };

        let customer = CustomerRepository::fetch_in_tx(tx.as_mut(), &order.customer_id).await?;

        let mut free_delivery = free_delivery_eligible(
            &self.config.pricing,
            distance_km,
            customer.free_delivery_used_count,
        );
        if free_delivery {
            // Guarded claim: if a concurrent confirmation spent the benefit
            // first, this order pays the normal charge.
            free_delivery =
                CustomerRepository::claim_free_delivery(tx.as_mut(), &customer.id).await?;
        }

        // The benefit zeroes the recorded charge itself, not just the final
        // price; a waived order shows ₹0 delivery on its receipt.
        let charge = if free_delivery {
            Money::zero()
        } else {
            delivery_charge(distance_km).charge()
        };
        let locked = final_price(total, charge, free_delivery);

        OrderRepository::set_confirmed_pricing(
            tx.as_mut(),
            order_id,
            total.paise(),
            charge.paise(),
            locked.paise(),
            free_delivery,
        )
        .await?;

        self.transition(tx.as_mut(), &order, OrderStatus::Confirmed).await?;
        let receipt_number = ensure_receipt(tx.as_mut(), &order).await?;

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry(
                "order.confirm",
                "order",
                order_id,
                Some(format!(
                    "receipt {receipt_number}, final ₹{}, free delivery: {free_delivery}",
                    locked.rupees()
                )),
            ),
        )
        .await?;

        NotificationOutboxRepository::enqueue_in_tx(
            tx.as_mut(),
            &outbox_entry(
                NotificationEventType::OrderConfirmed,
                &customer.phone,
                json!({
                    "order_id": order_id,
                    "receipt_number": receipt_number,
                    "final_price_paise": locked.paise(),
                    "free_delivery": free_delivery,
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(%order_id, receipt = %receipt_number, "Order confirmed");
        self.fetch(order_id).await
    }

    /// Re-snapshots an enquiry order's prices and deducts stock, clamping at
    /// zero. A shortfall is logged for the admin, never fatal: the shop
    /// honors confirmed enquiries and restocks.
    async fn reprice_and_stock_enquiry(
        &self,
        conn: &mut SqliteConnection,
        order: &Order,
    ) -> EngineResult<Money> {
        let items = OrderRepository::items_in_tx(conn, &order.id).await?;
        let mut total = Money::zero();

        for item in &items {
            let product = ProductRepository::fetch_in_tx(conn, &item.product_id).await?;
            let unit_price = Money::from_paise(product.price_paise);
            let line_total = unit_price.multiply_quantity(item.quantity);

            OrderRepository::reprice_item(conn, &item.id, unit_price.paise(), line_total.paise())
                .await?;
            total = total + line_total;

            if product.stock_quantity < item.quantity {
                warn!(
                    sku = %product.sku,
                    available = product.stock_quantity,
                    requested = item.quantity,
                    "Enquiry confirmation exceeds stock; clamping at zero"
                );
            }
            ProductRepository::deduct_stock_clamped(conn, &product.id, item.quantity).await?;
        }

        OrderRepository::mark_stock_deducted(conn, &order.id).await?;
        Ok(total)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Sends a Confirmed order out for delivery. Generates a fresh 6-digit
    /// OTP (every dispatch, even after an earlier one was issued) and queues
    /// it to the customer.
    pub async fn dispatch_order(&self, ctx: &AuditContext, order_id: &str) -> EngineResult<Order> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let order = OrderRepository::fetch_for_update(tx.as_mut(), order_id).await?;
        check_transition(&order, OrderStatus::OutForDelivery, ctx)?;

        let otp = generate_otp();
        OrderRepository::set_delivery_otp(tx.as_mut(), order_id, &otp).await?;

        self.transition(tx.as_mut(), &order, OrderStatus::OutForDelivery).await?;
        let receipt_number = ensure_receipt(tx.as_mut(), &order).await?;

        let customer = CustomerRepository::fetch_in_tx(tx.as_mut(), &order.customer_id).await?;

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry("order.dispatch", "order", order_id, None),
        )
        .await?;

        NotificationOutboxRepository::enqueue_in_tx(
            tx.as_mut(),
            &outbox_entry(
                NotificationEventType::DeliveryOtpIssued,
                &customer.phone,
                json!({
                    "order_id": order_id,
                    "receipt_number": receipt_number,
                    "otp": otp,
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(%order_id, "Order out for delivery");
        self.fetch(order_id).await
    }

    // =========================================================================
    // Deliver
    // =========================================================================

    /// Completes delivery. The presented OTP must match the stored one; a
    /// mismatch leaves the order untouched and the courier may retry.
    /// The OTP is kept on the row afterwards as proof of handover.
    pub async fn deliver_order(
        &self,
        ctx: &AuditContext,
        order_id: &str,
        presented_otp: &str,
    ) -> EngineResult<Order> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let order = OrderRepository::fetch_for_update(tx.as_mut(), order_id).await?;
        check_transition(&order, OrderStatus::Delivered, ctx)?;

        if order.delivery_otp.as_deref() != Some(presented_otp) {
            // Rolls back; nothing was written.
            return Err(CoreError::OtpMismatch {
                order_id: order_id.to_string(),
            }
            .into());
        }

        self.transition(tx.as_mut(), &order, OrderStatus::Delivered).await?;
        let receipt_number = ensure_receipt(tx.as_mut(), &order).await?;

        let customer = CustomerRepository::fetch_in_tx(tx.as_mut(), &order.customer_id).await?;

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry("order.deliver", "order", order_id, None),
        )
        .await?;

        NotificationOutboxRepository::enqueue_in_tx(
            tx.as_mut(),
            &outbox_entry(
                NotificationEventType::OrderDelivered,
                &customer.phone,
                json!({
                    "order_id": order_id,
                    "receipt_number": receipt_number,
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(%order_id, "Order delivered");
        self.fetch(order_id).await
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels an order. Customers may cancel their own Pending orders;
    /// admins may cancel anything not yet Delivered. Stock deducted for the
    /// order is restored exactly once; a spent free delivery and an assigned
    /// receipt number are NOT given back.
    pub async fn cancel_order(
        &self,
        ctx: &AuditContext,
        order_id: &str,
        reason: &str,
    ) -> EngineResult<Order> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let order = OrderRepository::fetch_for_update(tx.as_mut(), order_id).await?;
        check_transition(&order, OrderStatus::Cancelled, ctx)?;

        if order.stock_deducted {
            let items = OrderRepository::items_in_tx(tx.as_mut(), &order.id).await?;
            for item in &items {
                ProductRepository::restore_stock(tx.as_mut(), &item.product_id, item.quantity)
                    .await?;
            }
            OrderRepository::clear_stock_deducted(tx.as_mut(), &order.id).await?;
        }

        OrderRepository::set_cancellation_reason(tx.as_mut(), order_id, reason).await?;
        self.transition(tx.as_mut(), &order, OrderStatus::Cancelled).await?;

        let customer = CustomerRepository::fetch_in_tx(tx.as_mut(), &order.customer_id).await?;

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry("order.cancel", "order", order_id, Some(reason.to_string())),
        )
        .await?;

        NotificationOutboxRepository::enqueue_in_tx(
            tx.as_mut(),
            &outbox_entry(
                NotificationEventType::OrderCancelled,
                &customer.phone,
                json!({
                    "order_id": order_id,
                    "reason": reason,
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(%order_id, %reason, "Order cancelled");
        self.fetch(order_id).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Applies the guarded status UPDATE; zero rows means the precondition
    /// was lost to a concurrent writer.
    async fn transition(
        &self,
        conn: &mut SqliteConnection,
        order: &Order,
        to: OrderStatus,
    ) -> EngineResult<()> {
        let moved = OrderRepository::transition_status(conn, &order.id, order.status, to).await?;
        if !moved {
            return Err(EngineError::Conflict(format!(
                "order {} left {} concurrently",
                order.id, order.status
            )));
        }
        Ok(())
    }

    async fn fetch(&self, order_id: &str) -> EngineResult<Order> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", order_id))
    }
}

/// Checks the transition table before any write happens.
fn check_transition(order: &Order, to: OrderStatus, ctx: &AuditContext) -> EngineResult<()> {
    if !order.status.can_become(to, ctx.role) {
        return Err(CoreError::InvalidTransition {
            entity: "order",
            id: order.id.clone(),
            current: order.status.to_string(),
            attempted: to.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Assigns the order's receipt identity if it does not have one yet.
///
/// Sequence = `MAX + 1` over committed rows for the financial year, inside
/// this transaction; the UNIQUE index is the concurrency backstop. The
/// `receipt_number IS NULL` guard makes re-entry a no-op.
async fn ensure_receipt(conn: &mut SqliteConnection, order: &Order) -> EngineResult<String> {
    if let Some(number) = &order.receipt_number {
        return Ok(number.clone());
    }

    let financial_year = period_key(Utc::now().date_naive());
    let sequence = OrderRepository::next_receipt_sequence(conn, &financial_year).await?;
    let number = format_receipt_number(ReceiptPrefix::Order, &financial_year, sequence);

    OrderRepository::assign_receipt(conn, &order.id, &number, &financial_year, sequence).await?;
    Ok(number)
}

/// A fresh 6-digit delivery OTP.
fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use uuid::Uuid;

    use volta_core::{Customer, Product};
    use volta_db::DbConfig;

    use crate::checkout::{CheckoutService, OrderItemRequest, PlaceOrderRequest};
    use crate::geocode::FixedDistanceResolver;

    struct Fixture {
        db: Database,
        checkout: CheckoutService,
        fulfillment: FulfillmentService,
        customer: Customer,
        product: Product,
    }

    async fn setup(distance_km: f64) -> Fixture {
        setup_with(DbConfig::in_memory(), distance_km).await
    }

    async fn setup_with(config: DbConfig, distance_km: f64) -> Fixture {
        let db = Database::new(config).await.unwrap();
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
            name: "Ceiling Fan 1200mm White".into(),
            description: None,
            category: Some("fans".into()),
            price_paise: 50_000,
            stock_quantity: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();

        Fixture {
            checkout: CheckoutService::new(
                db.clone(),
                Arc::new(FixedDistanceResolver::new(distance_km)),
            ),
            fulfillment: FulfillmentService::new(db.clone(), EngineConfig::default()),
            db,
            customer,
            product,
        }
    }

    fn admin() -> AuditContext {
        AuditContext::admin("meera", None)
    }

    async fn place(f: &Fixture, order_type: OrderType, qty: i64) -> Order {
        f.checkout
            .place_order(
                &AuditContext::customer(&f.customer.phone, None),
                PlaceOrderRequest {
                    customer_id: f.customer.id.clone(),
                    order_type,
                    delivery_address: f.customer.address.clone(),
                    items: vec![OrderItemRequest {
                        product_id: f.product.id.clone(),
                        quantity: qty,
                    }],
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_confirmation_locks_total_plus_tier_charge() {
        // ₹500 of goods at 4.0 km: the ₹70 tier applies, final ₹570.
        let f = setup(4.0).await;
        let order = place(&f, OrderType::Standard, 1).await;

        let confirmed = f
            .fulfillment
            .confirm_order(&admin(), &order.id, None)
            .await
            .unwrap();

        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert_eq!(confirmed.total_price_paise, 50_000);
        assert_eq!(confirmed.delivery_charge_paise, 7_000);
        assert_eq!(confirmed.final_price_paise, Some(57_000));
        assert_eq!(
            confirmed.delivery_charge_status,
            volta_core::DeliveryChargeStatus::Confirmed
        );
        assert!(!confirmed.free_delivery_applied);

        // First Confirmed assigns the receipt identity
        assert_eq!(confirmed.receipt_sequence, Some(1));
        let fy = period_key(Utc::now().date_naive());
        assert_eq!(
            confirmed.receipt_number.as_deref(),
            Some(format_receipt_number(ReceiptPrefix::Order, &fy, 1).as_str())
        );

        // Confirmation queued a notification
        assert_eq!(f.db.outbox().count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_free_delivery_applies_once_within_ceiling() {
        let f = setup(2.0).await;

        let first = place(&f, OrderType::Standard, 1).await;
        let confirmed = f
            .fulfillment
            .confirm_order(&admin(), &first.id, None)
            .await
            .unwrap();

        // 2.0 km is inside the ceiling: the recorded charge is zeroed and
        // the final price is the goods total alone
        assert!(confirmed.free_delivery_applied);
        assert_eq!(confirmed.delivery_charge_paise, 0);
        assert_eq!(confirmed.final_price_paise, Some(50_000));

        let customer = f
            .db
            .customers()
            .get_by_id(&f.customer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.free_delivery_used_count, 1);

        // The benefit is lifetime-once: the second order pays
        let second = place(&f, OrderType::Standard, 1).await;
        let confirmed = f
            .fulfillment
            .confirm_order(&admin(), &second.id, None)
            .await
            .unwrap();
        assert!(!confirmed.free_delivery_applied);
        assert_eq!(confirmed.delivery_charge_paise, 5_000);
        assert_eq!(confirmed.final_price_paise, Some(55_000));
    }

    #[tokio::test]
    async fn test_enquiry_confirmation_reprices_and_clamps_stock() {
        let f = setup(2.0).await;
        let order = place(&f, OrderType::Enquiry, 25).await;

        // Catalog price changed between enquiry and confirmation
        let mut product = f.product.clone();
        product.price_paise = 60_000;
        f.db.products().update(&product).await.unwrap();

        let confirmed = f
            .fulfillment
            .confirm_order(&admin(), &order.id, None)
            .await
            .unwrap();

        // 25 × ₹600 from the current catalog
        assert_eq!(confirmed.total_price_paise, 25 * 60_000);
        assert!(confirmed.stock_deducted);

        let items = f.db.orders().get_items(&order.id).await.unwrap();
        assert_eq!(items[0].unit_price_paise, 60_000);

        // 25 requested against 10 in stock clamps at zero
        let stocked = f.db.products().get_by_id(&f.product.id).await.unwrap().unwrap();
        assert_eq!(stocked.stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_distance_override_reprices_delivery() {
        let f = setup(0.0).await; // geocoder knew nothing
        let order = place(&f, OrderType::Standard, 1).await;
        assert_eq!(order.delivery_charge_paise, 0);

        let confirmed = f
            .fulfillment
            .confirm_order(&admin(), &order.id, Some(6.5))
            .await
            .unwrap();

        assert_eq!(confirmed.distance_km, 6.5);
        assert_eq!(confirmed.delivery_charge_paise, 8_000);
        assert_eq!(confirmed.final_price_paise, Some(58_000));
    }

    #[tokio::test]
    async fn test_dispatch_issues_fresh_otp() {
        let f = setup(4.0).await;
        let order = place(&f, OrderType::Standard, 1).await;
        f.fulfillment.confirm_order(&admin(), &order.id, None).await.unwrap();

        let dispatched = f.fulfillment.dispatch_order(&admin(), &order.id).await.unwrap();

        assert_eq!(dispatched.status, OrderStatus::OutForDelivery);
        let otp = dispatched.delivery_otp.unwrap();
        assert_eq!(otp.len(), 6);
        assert!(otp.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_wrong_otp_leaves_order_untouched() {
        let f = setup(4.0).await;
        let order = place(&f, OrderType::Standard, 1).await;
        f.fulfillment.confirm_order(&admin(), &order.id, None).await.unwrap();
        let dispatched = f.fulfillment.dispatch_order(&admin(), &order.id).await.unwrap();

        let otp = dispatched.delivery_otp.clone().unwrap();
        let wrong = if otp == "000000" { "000001" } else { "000000" };

        let err = f
            .fulfillment
            .deliver_order(&admin(), &order.id, wrong)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::OtpMismatch { .. })));

        // Row untouched: still out for delivery, OTP unchanged
        let row = f.db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(row.status, OrderStatus::OutForDelivery);
        assert_eq!(row.delivery_otp.as_deref(), Some(otp.as_str()));

        // The right code still works, and the OTP is kept for audit
        let delivered = f
            .fulfillment
            .deliver_order(&admin(), &order.id, &otp)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.delivery_otp.as_deref(), Some(otp.as_str()));
    }

    #[tokio::test]
    async fn test_receipt_identity_stable_across_transitions() {
        let f = setup(4.0).await;
        let order = place(&f, OrderType::Standard, 1).await;

        let confirmed = f.fulfillment.confirm_order(&admin(), &order.id, None).await.unwrap();
        let number = confirmed.receipt_number.clone().unwrap();

        let dispatched = f.fulfillment.dispatch_order(&admin(), &order.id).await.unwrap();
        assert_eq!(dispatched.receipt_number.as_deref(), Some(number.as_str()));

        let otp = dispatched.delivery_otp.unwrap();
        let delivered = f.fulfillment.deliver_order(&admin(), &order.id, &otp).await.unwrap();
        assert_eq!(delivered.receipt_number.as_deref(), Some(number.as_str()));
        assert_eq!(delivered.receipt_sequence, confirmed.receipt_sequence);
    }

    #[tokio::test]
    async fn test_sequences_stay_dense_across_confirmations() {
        let f = setup(4.0).await;
        let mut orders = Vec::new();
        for _ in 0..4 {
            orders.push(place(&f, OrderType::Standard, 1).await);
        }
        for order in &orders {
            f.fulfillment.confirm_order(&admin(), &order.id, None).await.unwrap();
        }

        let fy = period_key(Utc::now().date_naive());
        let sequences = f.db.orders().receipt_sequences(&fy).await.unwrap();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_allocate_dense_sequences() {
        // File-backed so the two confirmations run on separate connections
        // and genuinely race the MAX+1 allocation; the loser replays.
        let path = std::env::temp_dir().join(format!("volta-orders-{}.db", Uuid::new_v4()));
        let f = setup_with(DbConfig::new(&path), 4.0).await;

        let first = place(&f, OrderType::Standard, 1).await;
        let second = place(&f, OrderType::Standard, 1).await;

        let actor = admin();
        let (a, b) = tokio::join!(
            f.fulfillment.confirm_order(&actor, &first.id, None),
            f.fulfillment.confirm_order(&actor, &second.id, None),
        );
        let a = a.unwrap();
        let b = b.unwrap();

        let mut assigned = vec![a.receipt_sequence.unwrap(), b.receipt_sequence.unwrap()];
        assigned.sort_unstable();
        assert_eq!(assigned, vec![1, 2]);

        let fy = period_key(Utc::now().date_naive());
        assert_eq!(f.db.orders().receipt_sequences(&fy).await.unwrap(), vec![1, 2]);

        drop(f);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_cancellation_restores_stock_once_and_keeps_number() {
        let f = setup(4.0).await;
        let order = place(&f, OrderType::Standard, 3).await;
        let confirmed = f.fulfillment.confirm_order(&admin(), &order.id, None).await.unwrap();
        assert_eq!(
            f.db.products().get_by_id(&f.product.id).await.unwrap().unwrap().stock_quantity,
            7
        );

        let cancelled = f
            .fulfillment
            .cancel_order(&admin(), &order.id, "customer changed mind")
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(!cancelled.stock_deducted);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("customer changed mind"));
        // The number stays burned on the cancelled order
        assert_eq!(cancelled.receipt_number, confirmed.receipt_number);
        assert_eq!(
            f.db.products().get_by_id(&f.product.id).await.unwrap().unwrap().stock_quantity,
            10
        );

        // Terminal: cancelling again is rejected, stock not restored twice
        let err = f
            .fulfillment
            .cancel_order(&admin(), &order.id, "again")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
        assert_eq!(
            f.db.products().get_by_id(&f.product.id).await.unwrap().unwrap().stock_quantity,
            10
        );
    }

    #[tokio::test]
    async fn test_next_order_after_cancellation_takes_next_sequence() {
        let f = setup(4.0).await;
        let first = place(&f, OrderType::Standard, 1).await;
        f.fulfillment.confirm_order(&admin(), &first.id, None).await.unwrap();
        f.fulfillment
            .cancel_order(&admin(), &first.id, "out of area")
            .await
            .unwrap();

        let second = place(&f, OrderType::Standard, 1).await;
        let confirmed = f.fulfillment.confirm_order(&admin(), &second.id, None).await.unwrap();

        // Number 1 stays with the cancelled order; the next order takes 2
        assert_eq!(confirmed.receipt_sequence, Some(2));
    }

    #[tokio::test]
    async fn test_customer_cannot_cancel_confirmed_order() {
        let f = setup(4.0).await;
        let order = place(&f, OrderType::Standard, 1).await;
        f.fulfillment.confirm_order(&admin(), &order.id, None).await.unwrap();

        let customer_ctx = AuditContext::customer(&f.customer.phone, None);
        let err = f
            .fulfillment
            .cancel_order(&customer_ctx, &order.id, "changed mind")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_double_confirmation_rejected() {
        let f = setup(4.0).await;
        let order = place(&f, OrderType::Standard, 1).await;
        f.fulfillment.confirm_order(&admin(), &order.id, None).await.unwrap();

        let err = f
            .fulfillment
            .confirm_order(&admin(), &order.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
    }
}

//! # Checkout Service
//!
//! Places orders. The only service that creates Order rows.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(ctx, request)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate input ──► resolve distance (failure → 0.0, never blocks)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │    fetch customer, fetch products, snapshot prices                     │
//! │    Standard order:  guarded stock deduction (short → InsufficientStock,│
//! │                     whole checkout rolls back)                          │
//! │    Enquiry order:   no stock touched until admin confirmation           │
//! │    INSERT order (Pending, charge ESTIMATED) + items + activity entry   │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No receipt number is allocated here: Pending orders are not yet part of
//! the gap-free sequence, so an abandoned cart never burns a number.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use volta_core::pricing::delivery_charge;
use volta_core::validation::{validate_order_size, validate_quantity};
use volta_core::{
    CoreError, DeliveryChargeStatus, Money, Order, OrderItem, OrderStatus, OrderType,
    ValidationError,
};
use volta_db::repository::audit::AuditRepository;
use volta_db::repository::customer::CustomerRepository;
use volta_db::repository::order::OrderRepository;
use volta_db::repository::product::ProductRepository;
use volta_db::Database;

use crate::context::AuditContext;
use crate::error::EngineResult;
use crate::geocode::{resolve_or_unknown, DistanceResolver};

/// One requested line item.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// A checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub order_type: OrderType,
    pub delivery_address: String,
    pub items: Vec<OrderItemRequest>,
}

/// Places orders.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    resolver: Arc<dyn DistanceResolver>,
}

impl CheckoutService {
    pub fn new(db: Database, resolver: Arc<dyn DistanceResolver>) -> Self {
        CheckoutService { db, resolver }
    }

    /// Places an order.
    ///
    /// Standard orders deduct stock inside the checkout transaction; a
    /// shortfall fails the whole checkout. Enquiry orders defer both pricing
    /// and stock to admin confirmation.
    pub async fn place_order(
        &self,
        ctx: &AuditContext,
        request: PlaceOrderRequest,
    ) -> EngineResult<Order> {
        validate_order_size(request.items.len())?;
        for item in &request.items {
            validate_quantity(item.quantity)?;
        }
        if request.delivery_address.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "delivery_address".to_string(),
            }
            .into());
        }

        // Outside the transaction: the resolver may be slow, and its failure
        // must not block checkout.
        let distance_km = resolve_or_unknown(self.resolver.as_ref(), &request.delivery_address).await;
        let quote = delivery_charge(distance_km);

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let customer = CustomerRepository::fetch_in_tx(tx.as_mut(), &request.customer_id).await?;

        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut items = Vec::with_capacity(request.items.len());
        let mut total = Money::zero();

        for line in &request.items {
            let product = ProductRepository::fetch_in_tx(tx.as_mut(), &line.product_id).await?;
            if !product.is_active {
                return Err(CoreError::ProductNotFound(line.product_id.clone()).into());
            }

            if request.order_type == OrderType::Standard {
                let deducted =
                    ProductRepository::deduct_stock_checked(tx.as_mut(), &product.id, line.quantity)
                        .await?;
                if !deducted {
                    return Err(CoreError::InsufficientStock {
                        sku: product.sku,
                        available: product.stock_quantity,
                        requested: line.quantity,
                    }
                    .into());
                }
            }

            let unit_price = Money::from_paise(product.price_paise);
            let line_total = unit_price.multiply_quantity(line.quantity);
            total = total + line_total;

            items.push(OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                sku_snapshot: product.sku.clone(),
                name_snapshot: product.name.clone(),
                unit_price_paise: unit_price.paise(),
                quantity: line.quantity,
                line_total_paise: line_total.paise(),
                created_at: now,
            });
        }

        let order = Order {
            id: order_id,
            customer_id: customer.id.clone(),
            order_type: request.order_type,
            status: OrderStatus::Pending,
            delivery_address: request.delivery_address.trim().to_string(),
            distance_km,
            total_price_paise: total.paise(),
            delivery_charge_paise: quote.charge().paise(),
            delivery_charge_status: DeliveryChargeStatus::Estimated,
            final_price_paise: None,
            free_delivery_applied: false,
            stock_deducted: request.order_type == OrderType::Standard,
            delivery_otp: None,
            receipt_number: None,
            financial_year: None,
            receipt_sequence: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        OrderRepository::insert_in_tx(tx.as_mut(), &order).await?;
        for item in &items {
            OrderRepository::insert_item_in_tx(tx.as_mut(), item).await?;
        }

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry(
                "order.place",
                "order",
                &order.id,
                Some(format!(
                    "{} item(s), type {:?}, distance {:.1} km",
                    items.len(),
                    order.order_type,
                    distance_km
                )),
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(
            order_id = %order.id,
            customer_id = %customer.id,
            total_paise = total.paise(),
            "Order placed"
        );

        Ok(order)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::{FailingResolver, FixedDistanceResolver};
    use volta_core::{Customer, Product};
    use volta_db::DbConfig;

    async fn setup() -> (Database, Customer, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
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

        (db, customer, product)
    }

    fn request(customer: &Customer, product: &Product, qty: i64) -> PlaceOrderRequest {
        PlaceOrderRequest {
            customer_id: customer.id.clone(),
            order_type: OrderType::Standard,
            delivery_address: customer.address.clone(),
            items: vec![OrderItemRequest {
                product_id: product.id.clone(),
                quantity: qty,
            }],
        }
    }

    #[tokio::test]
    async fn test_standard_checkout_deducts_stock() {
        let (db, customer, product) = setup().await;
        let service =
            CheckoutService::new(db.clone(), Arc::new(FixedDistanceResolver::new(4.0)));
        let ctx = AuditContext::customer(&customer.phone, None);

        let order = service
            .place_order(&ctx, request(&customer, &product, 2))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price_paise, 100_000);
        // 4.0 km falls in the ₹70 tier, recorded as an estimate
        assert_eq!(order.delivery_charge_paise, 7_000);
        assert_eq!(order.delivery_charge_status, DeliveryChargeStatus::Estimated);
        assert!(order.final_price_paise.is_none());
        assert!(order.stock_deducted);

        let stocked = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stocked.stock_quantity, 8);

        let items = db.orders().get_items(&order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price_paise, 50_000);
        assert_eq!(items[0].line_total_paise, 100_000);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_checkout() {
        let (db, customer, product) = setup().await;
        let service =
            CheckoutService::new(db.clone(), Arc::new(FixedDistanceResolver::new(2.0)));
        let ctx = AuditContext::customer(&customer.phone, None);

        let err = service
            .place_order(&ctx, request(&customer, &product, 11))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Core(CoreError::InsufficientStock { .. })
        ));

        // Nothing persisted
        assert!(db
            .orders()
            .list_by_customer(&customer.id)
            .await
            .unwrap()
            .is_empty());
        let stocked = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stocked.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_enquiry_checkout_leaves_stock_alone() {
        let (db, customer, product) = setup().await;
        let service =
            CheckoutService::new(db.clone(), Arc::new(FixedDistanceResolver::new(2.0)));
        let ctx = AuditContext::customer(&customer.phone, None);

        let mut req = request(&customer, &product, 25);
        req.order_type = OrderType::Enquiry;
        let order = service.place_order(&ctx, req).await.unwrap();

        assert!(!order.stock_deducted);
        let stocked = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stocked.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_geocoding_failure_degrades_to_unknown_distance() {
        let (db, customer, product) = setup().await;
        let service = CheckoutService::new(db.clone(), Arc::new(FailingResolver));
        let ctx = AuditContext::customer(&customer.phone, None);

        let order = service
            .place_order(&ctx, request(&customer, &product, 1))
            .await
            .unwrap();

        assert_eq!(order.distance_km, 0.0);
        // Unknown distance quotes no charge; an admin settles it later
        assert_eq!(order.delivery_charge_paise, 0);
        assert_eq!(order.delivery_charge_status, DeliveryChargeStatus::Estimated);
    }

    #[tokio::test]
    async fn test_checkout_is_audited() {
        let (db, customer, product) = setup().await;
        let service =
            CheckoutService::new(db.clone(), Arc::new(FixedDistanceResolver::new(2.0)));
        let ctx = AuditContext::customer(&customer.phone, Some("10.1.2.3".into()));

        let order = service
            .place_order(&ctx, request(&customer, &product, 1))
            .await
            .unwrap();

        let history = db.audit().history_for("order", &order.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "order.place");
        assert_eq!(history[0].actor, customer.phone);
    }
}

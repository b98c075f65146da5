//! # Order Repository
//!
//! Orders, their line items, and the receipt-sequence allocation that backs
//! gap-free `ORD/YY/NNNN` numbering.
//!
//! ## Sequence Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Inside the confirmation transaction:                                   │
//! │                                                                         │
//! │  1. SELECT COALESCE(MAX(receipt_sequence), 0) + 1                      │
//! │     FROM orders WHERE financial_year = ?                               │
//! │                                                                         │
//! │  2. UPDATE orders SET receipt_sequence = <n>, ...                      │
//! │                                                                         │
//! │  3. COMMIT                                                              │
//! │     └── UNIQUE(financial_year, receipt_sequence) backstops the race:   │
//! │         the losing writer gets a UniqueViolation and volta-engine      │
//! │         retries the whole transaction once.                            │
//! │                                                                         │
//! │  MAX+1 (not a counter table) is what makes the numbering gap-free:    │
//! │  a rolled-back transaction leaves no hole because nothing was          │
//! │  consumed outside it.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status writes are guarded UPDATEs (`WHERE status = <expected>`): if the
//! row moved under us, rows_affected is 0 and the caller re-reads instead of
//! clobbering a concurrent transition.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use volta_core::{DeliveryChargeStatus, Order, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str = "id, customer_id, order_type, status, delivery_address, \
     distance_km, total_price_paise, delivery_charge_paise, delivery_charge_status, \
     final_price_paise, free_delivery_applied, stock_deducted, delivery_otp, \
     receipt_number, financial_year, receipt_sequence, cancellation_reason, \
     created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, sku_snapshot, name_snapshot, \
     unit_price_paise, quantity, line_total_paise, created_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets the line items of an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let query =
            format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at");
        let items = sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Lists orders in a given status, oldest first (the admin work queue).
    pub async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        let query =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 ORDER BY created_at");
        let orders = sqlx::query_as::<_, Order>(&query)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Lists a customer's orders, newest first.
    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Order>> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?1 ORDER BY created_at DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&query)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    // =========================================================================
    // Transactional helpers
    // =========================================================================

    /// Inserts an order row inside an open transaction.
    pub async fn insert_in_tx(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(order_id = %order.id, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, order_type, status, delivery_address,
                distance_km, total_price_paise, delivery_charge_paise,
                delivery_charge_status, final_price_paise, free_delivery_applied,
                stock_deducted, delivery_otp, receipt_number, financial_year,
                receipt_sequence, cancellation_reason, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(order.order_type)
        .bind(order.status)
        .bind(&order.delivery_address)
        .bind(order.distance_km)
        .bind(order.total_price_paise)
        .bind(order.delivery_charge_paise)
        .bind(order.delivery_charge_status)
        .bind(order.final_price_paise)
        .bind(order.free_delivery_applied)
        .bind(order.stock_deducted)
        .bind(&order.delivery_otp)
        .bind(&order.receipt_number)
        .bind(&order.financial_year)
        .bind(order.receipt_sequence)
        .bind(&order.cancellation_reason)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a line item inside an open transaction.
    pub async fn insert_item_in_tx(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, product_id, sku_snapshot, name_snapshot,
                unit_price_paise, quantity, line_total_paise, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(&item.sku_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.unit_price_paise)
        .bind(item.quantity)
        .bind(item.line_total_paise)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Fetches an order inside an open transaction.
    pub async fn fetch_for_update(conn: &mut SqliteConnection, id: &str) -> DbResult<Order> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        Ok(order)
    }

    /// Fetches an order's items inside an open transaction.
    pub async fn items_in_tx(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let query =
            format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at");
        let items = sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(items)
    }

    /// Moves an order between statuses with a guard on the expected current
    /// status.
    ///
    /// ## Returns
    /// * `Ok(true)` - transition applied
    /// * `Ok(false)` - order was no longer in `from`; nothing changed
    pub async fn transition_status(
        conn: &mut SqliteConnection,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Next receipt sequence for a financial year: `MAX + 1` over committed
    /// rows. Must run inside the transaction that will claim the number.
    pub async fn next_receipt_sequence(
        conn: &mut SqliteConnection,
        financial_year: &str,
    ) -> DbResult<i64> {
        let next: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(receipt_sequence), 0) + 1
            FROM orders
            WHERE financial_year = ?1
            "#,
        )
        .bind(financial_year)
        .fetch_one(&mut *conn)
        .await?;

        Ok(next)
    }

    /// Assigns receipt identity to an order, once.
    ///
    /// The `receipt_number IS NULL` guard makes the assignment idempotent:
    /// re-confirming an already numbered order changes nothing.
    ///
    /// ## Returns
    /// * `Ok(true)` - identity written
    /// * `Ok(false)` - order already had a receipt number
    pub async fn assign_receipt(
        conn: &mut SqliteConnection,
        id: &str,
        receipt_number: &str,
        financial_year: &str,
        sequence: i64,
    ) -> DbResult<bool> {
        debug!(order_id = %id, receipt = %receipt_number, "Assigning receipt number");

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                receipt_number = ?2, financial_year = ?3,
                receipt_sequence = ?4, updated_at = ?5
            WHERE id = ?1 AND receipt_number IS NULL
            "#,
        )
        .bind(id)
        .bind(receipt_number)
        .bind(financial_year)
        .bind(sequence)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Writes the confirmation pricing block: locked delivery charge, final
    /// price, and the free-delivery marker.
    pub async fn set_confirmed_pricing(
        conn: &mut SqliteConnection,
        id: &str,
        total_price_paise: i64,
        delivery_charge_paise: i64,
        final_price_paise: i64,
        free_delivery_applied: bool,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                total_price_paise = ?2,
                delivery_charge_paise = ?3,
                delivery_charge_status = ?4,
                final_price_paise = ?5,
                free_delivery_applied = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(total_price_paise)
        .bind(delivery_charge_paise)
        .bind(DeliveryChargeStatus::Confirmed)
        .bind(final_price_paise)
        .bind(free_delivery_applied)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Refreshes an enquiry item's price snapshot at confirmation time.
    pub async fn reprice_item(
        conn: &mut SqliteConnection,
        item_id: &str,
        unit_price_paise: i64,
        line_total_paise: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE order_items SET unit_price_paise = ?2, line_total_paise = ?3 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(unit_price_paise)
        .bind(line_total_paise)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OrderItem", item_id));
        }

        Ok(())
    }

    /// Updates the delivery distance (admin override before confirmation).
    pub async fn set_distance(
        conn: &mut SqliteConnection,
        id: &str,
        distance_km: f64,
    ) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE orders SET distance_km = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(distance_km)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Records that stock has been deducted for this order.
    pub async fn mark_stock_deducted(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE orders SET stock_deducted = 1, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Clears the stock-deducted flag after a cancellation restored stock.
    pub async fn clear_stock_deducted(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE orders SET stock_deducted = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Stores the delivery OTP (set or regenerated at dispatch).
    pub async fn set_delivery_otp(
        conn: &mut SqliteConnection,
        id: &str,
        otp: &str,
    ) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE orders SET delivery_otp = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(otp)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Records why an order was cancelled.
    pub async fn set_cancellation_reason(
        conn: &mut SqliteConnection,
        id: &str,
        reason: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET cancellation_reason = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(reason)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// All receipt sequences committed for a financial year, ascending.
    /// Used by gap audits and tests.
    pub async fn receipt_sequences(&self, financial_year: &str) -> DbResult<Vec<i64>> {
        let sequences: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT receipt_sequence FROM orders
            WHERE financial_year = ?1 AND receipt_sequence IS NOT NULL
            ORDER BY receipt_sequence
            "#,
        )
        .bind(financial_year)
        .fetch_all(&self.pool)
        .await?;

        Ok(sequences)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::customer::CustomerRepository;
    use uuid::Uuid;
    use volta_core::{Customer, OrderType};

    async fn seed_customer(db: &Database) -> Customer {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Asha Verma".into(),
            phone: format!("9{:09}", rand_suffix()),
            email: None,
            address: "12 MG Road".into(),
            pincode: "452001".into(),
            free_delivery_used_count: 0,
            created_at: now,
            updated_at: now,
        };
        db.customers().insert(&customer).await.unwrap();
        customer
    }

    fn rand_suffix() -> u64 {
        // Uuid gives us enough entropy for unique test phone numbers
        let id = Uuid::new_v4();
        (id.as_u128() % 1_000_000_000) as u64
    }

    fn order(customer_id: &str) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.into(),
            order_type: OrderType::Standard,
            status: OrderStatus::Pending,
            delivery_address: "12 MG Road, Indore".into(),
            distance_km: 2.0,
            total_price_paise: 50000,
            delivery_charge_paise: 0,
            delivery_charge_status: DeliveryChargeStatus::Estimated,
            final_price_paise: None,
            free_delivery_applied: false,
            stock_deducted: false,
            delivery_otp: None,
            receipt_number: None,
            financial_year: None,
            receipt_sequence: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert_order(db: &Database, o: &Order) {
        let mut tx = db.pool().begin().await.unwrap();
        OrderRepository::insert_in_tx(tx.as_mut(), o).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_fetch_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db).await;
        let o = order(&customer.id);
        insert_order(&db, &o).await;

        let fetched = db.orders().get_by_id(&o.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, OrderStatus::Pending);
        assert_eq!(fetched.order_type, OrderType::Standard);
        assert!(fetched.receipt_number.is_none());
    }

    #[tokio::test]
    async fn test_guarded_transition() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db).await;
        let o = order(&customer.id);
        insert_order(&db, &o).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(OrderRepository::transition_status(
            tx.as_mut(),
            &o.id,
            OrderStatus::Pending,
            OrderStatus::Confirmed
        )
        .await
        .unwrap());
        // Guard fails once the order has moved on
        assert!(!OrderRepository::transition_status(
            tx.as_mut(),
            &o.id,
            OrderStatus::Pending,
            OrderStatus::Confirmed
        )
        .await
        .unwrap());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_sequence_allocation_is_dense() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db).await;

        for _ in 0..4 {
            let o = order(&customer.id);
            insert_order(&db, &o).await;

            let mut tx = db.pool().begin().await.unwrap();
            let seq = OrderRepository::next_receipt_sequence(tx.as_mut(), "26")
                .await
                .unwrap();
            let number = format!("ORD/26/{seq:04}");
            assert!(
                OrderRepository::assign_receipt(tx.as_mut(), &o.id, &number, "26", seq)
                    .await
                    .unwrap()
            );
            tx.commit().await.unwrap();
        }

        let sequences = db.orders().receipt_sequences("26").await.unwrap();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_assign_receipt_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db).await;
        let o = order(&customer.id);
        insert_order(&db, &o).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(
            OrderRepository::assign_receipt(tx.as_mut(), &o.id, "ORD/26/0001", "26", 1)
                .await
                .unwrap()
        );
        // Second assignment hits the IS NULL guard
        assert!(
            !OrderRepository::assign_receipt(tx.as_mut(), &o.id, "ORD/26/0002", "26", 2)
                .await
                .unwrap()
        );
        tx.commit().await.unwrap();

        let fetched = db.orders().get_by_id(&o.id).await.unwrap().unwrap();
        assert_eq!(fetched.receipt_number.as_deref(), Some("ORD/26/0001"));
        assert_eq!(fetched.receipt_sequence, Some(1));
    }

    #[tokio::test]
    async fn test_duplicate_sequence_rejected_by_index() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db).await;
        let first = order(&customer.id);
        let second = order(&customer.id);
        insert_order(&db, &first).await;
        insert_order(&db, &second).await;

        let mut tx = db.pool().begin().await.unwrap();
        OrderRepository::assign_receipt(tx.as_mut(), &first.id, "ORD/26/0001", "26", 1)
            .await
            .unwrap();
        let err =
            OrderRepository::assign_receipt(tx.as_mut(), &second.id, "ORD/26/0001-dup", "26", 1)
                .await
                .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_items_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db).await;
        let o = order(&customer.id);

        let now = Utc::now();
        let product_id = Uuid::new_v4().to_string();
        // FK requires a product row
        let product = volta_core::Product {
            id: product_id.clone(),
            sku: "FAN-1200-WH".into(),
            name: "Ceiling Fan 1200mm".into(),
            description: None,
            category: None,
            price_paise: 25000,
            stock_quantity: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();

        let item = OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: o.id.clone(),
            product_id,
            sku_snapshot: "FAN-1200-WH".into(),
            name_snapshot: "Ceiling Fan 1200mm".into(),
            unit_price_paise: 25000,
            quantity: 2,
            line_total_paise: 50000,
            created_at: now,
        };

        let mut tx = db.pool().begin().await.unwrap();
        OrderRepository::insert_in_tx(tx.as_mut(), &o).await.unwrap();
        OrderRepository::insert_item_in_tx(tx.as_mut(), &item).await.unwrap();
        tx.commit().await.unwrap();

        let items = db.orders().get_items(&o.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line_total_paise, 50000);
    }
}

//! # Customer Repository
//!
//! Database operations for storefront customers, including the guarded
//! free-delivery counter.
//!
//! ## The Free-Delivery Counter
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One free delivery per customer LIFETIME.                               │
//! │                                                                         │
//! │  ❌ WRONG: read count, check == 0, then write count = 1                 │
//! │     Two concurrent confirmations both read 0 → both apply free         │
//! │     delivery → customer charged zero twice.                            │
//! │                                                                         │
//! │  ✅ CORRECT: guarded update                                             │
//! │     UPDATE customers SET free_delivery_used_count = 1                  │
//! │     WHERE id = ? AND free_delivery_used_count = 0                      │
//! │                                                                         │
//! │     rows_affected == 1 → this transaction claimed the freebie          │
//! │     rows_affected == 0 → someone else already did; charge normally     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use volta_core::Customer;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, email, address, pincode,
                   free_delivery_used_count, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by phone number (the business identifier).
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, email, address, pincode,
                   free_delivery_used_count, created_at, updated_at
            FROM customers
            WHERE phone = ?1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - phone already registered
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(phone = %customer.phone, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, email, address, pincode,
                free_delivery_used_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.pincode)
        .bind(customer.free_delivery_used_count)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a customer's contact details.
    pub async fn update_contact(
        &self,
        id: &str,
        name: &str,
        email: Option<&str>,
        address: &str,
        pincode: &str,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2, email = ?3, address = ?4, pincode = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(address)
        .bind(pincode)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Fetches a customer inside an open transaction.
    ///
    /// The order state machine reads the customer (free-delivery count)
    /// inside the same transaction that will write the order.
    pub async fn fetch_in_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Customer> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, email, address, pincode,
                   free_delivery_used_count, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", id))?;

        Ok(customer)
    }

    /// Claims the customer's one lifetime free delivery (guarded update).
    ///
    /// ## Returns
    /// * `Ok(true)` - this transaction claimed it; counter is now 1
    /// * `Ok(false)` - already used; caller must charge normally
    pub async fn claim_free_delivery(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                free_delivery_used_count = free_delivery_used_count + 1,
                updated_at = ?2
            WHERE id = ?1 AND free_delivery_used_count = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Counts registered customers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new customer ID.
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Product Repository
//!
//! Catalog CRUD plus the guarded stock mutations that ride order
//! transactions.
//!
//! ## Stock Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_quantity is a single counter, mutated only through:             │
//! │                                                                         │
//! │  deduct_stock_checked   UPDATE ... SET qty = qty - N                   │
//! │   (standard checkout,    WHERE id = ? AND qty >= N                     │
//! │    rejects oversell)     rows_affected == 0 → insufficient stock       │
//! │                                                                         │
//! │  deduct_stock_clamped   UPDATE ... SET qty = MAX(qty - N, 0)           │
//! │   (enquiry confirm:      Enquiry orders never reserved stock, so the   │
//! │    goods may already     shelf may have emptied legitimately since     │
//! │    be promised)          the enquiry was placed.                       │
//! │                                                                         │
//! │  restore_stock          UPDATE ... SET qty = qty + N                   │
//! │   (cancellation,         Runs once per order, gated by the order's     │
//! │    only if deducted)     stock_deducted flag.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! All three take `&mut SqliteConnection` so they share the caller's
//! transaction with the order status write.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use volta_core::Product;

const PRODUCT_COLUMNS: &str = "id, sku, name, description, category, price_paise, \
     stock_quantity, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by SKU (the business identifier).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products, newest first.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY created_at DESC"
        );
        let products = sqlx::query_as::<_, Product>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, category, price_paise,
                stock_quantity, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_paise)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates catalog fields (name, description, category, price).
    ///
    /// Stock is NOT updatable here; it only moves through the guarded
    /// stock functions below or [`ProductRepository::set_stock`].
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2, description = ?3, category = ?4,
                price_paise = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_paise)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Sets the absolute stock level (back-office stocktake correction).
    pub async fn set_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Activates or deactivates a product (soft delete).
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    // =========================================================================
    // Transactional helpers
    // =========================================================================

    /// Fetches a product inside an open transaction.
    pub async fn fetch_in_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        Ok(product)
    }

    /// Deducts stock, refusing to go below zero (guarded update).
    ///
    /// ## Returns
    /// * `Ok(true)` - stock deducted
    /// * `Ok(false)` - insufficient stock; nothing changed
    pub async fn deduct_stock_checked(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock_quantity = stock_quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND stock_quantity >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deducts stock clamping at zero.
    ///
    /// Used when an enquiry order is confirmed: the goods are already
    /// promised to the customer, so the deduction proceeds even if the
    /// shelf count has dropped below the ordered quantity in the meantime.
    pub async fn deduct_stock_clamped(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock_quantity = MAX(stock_quantity - ?2, 0),
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Restores stock after an order cancellation.
    ///
    /// The caller gates this on the order's `stock_deducted` flag so a
    /// cancellation can only ever give stock back once.
    pub async fn restore_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock_quantity = stock_quantity + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

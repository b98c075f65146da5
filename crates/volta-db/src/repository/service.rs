//! # Service Catalog Repositories
//!
//! Service types (with their visiting-charge brackets) and field
//! electricians. Both are small back-office catalogs.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use volta_core::{Electrician, ServiceType};

const SERVICE_TYPE_COLUMNS: &str = "id, name, description, base_visiting_charge_paise, \
     charge_upto_500m_paise, charge_upto_1km_paise, charge_upto_3km_paise, \
     charge_upto_5km_paise, charge_upto_7km_paise, is_active, created_at";

// =============================================================================
// Service Types
// =============================================================================

/// Repository for electrician service types.
#[derive(Debug, Clone)]
pub struct ServiceTypeRepository {
    pool: SqlitePool,
}

impl ServiceTypeRepository {
    /// Creates a new ServiceTypeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceTypeRepository { pool }
    }

    /// Gets a service type by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ServiceType>> {
        let query = format!("SELECT {SERVICE_TYPE_COLUMNS} FROM service_types WHERE id = ?1");
        let service = sqlx::query_as::<_, ServiceType>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(service)
    }

    /// Gets a service type by its unique name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<ServiceType>> {
        let query = format!("SELECT {SERVICE_TYPE_COLUMNS} FROM service_types WHERE name = ?1");
        let service = sqlx::query_as::<_, ServiceType>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(service)
    }

    /// Lists active service types alphabetically.
    pub async fn list_active(&self) -> DbResult<Vec<ServiceType>> {
        let query = format!(
            "SELECT {SERVICE_TYPE_COLUMNS} FROM service_types WHERE is_active = 1 ORDER BY name"
        );
        let services = sqlx::query_as::<_, ServiceType>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(services)
    }

    /// Inserts a service type.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already exists
    pub async fn insert(&self, service: &ServiceType) -> DbResult<()> {
        debug!(name = %service.name, "Inserting service type");

        sqlx::query(
            r#"
            INSERT INTO service_types (
                id, name, description, base_visiting_charge_paise,
                charge_upto_500m_paise, charge_upto_1km_paise,
                charge_upto_3km_paise, charge_upto_5km_paise,
                charge_upto_7km_paise, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.base_visiting_charge_paise)
        .bind(service.charge_upto_500m_paise)
        .bind(service.charge_upto_1km_paise)
        .bind(service.charge_upto_3km_paise)
        .bind(service.charge_upto_5km_paise)
        .bind(service.charge_upto_7km_paise)
        .bind(service.is_active)
        .bind(service.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the pricing configuration of a service type.
    pub async fn update_pricing(&self, service: &ServiceType) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE service_types SET
                description = ?2,
                base_visiting_charge_paise = ?3,
                charge_upto_500m_paise = ?4,
                charge_upto_1km_paise = ?5,
                charge_upto_3km_paise = ?6,
                charge_upto_5km_paise = ?7,
                charge_upto_7km_paise = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&service.id)
        .bind(&service.description)
        .bind(service.base_visiting_charge_paise)
        .bind(service.charge_upto_500m_paise)
        .bind(service.charge_upto_1km_paise)
        .bind(service.charge_upto_3km_paise)
        .bind(service.charge_upto_5km_paise)
        .bind(service.charge_upto_7km_paise)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ServiceType", &service.id));
        }

        Ok(())
    }

    /// Activates or deactivates a service type.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE service_types SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ServiceType", id));
        }

        Ok(())
    }
}

// =============================================================================
// Electricians
// =============================================================================

/// Repository for field electricians.
#[derive(Debug, Clone)]
pub struct ElectricianRepository {
    pool: SqlitePool,
}

impl ElectricianRepository {
    /// Creates a new ElectricianRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ElectricianRepository { pool }
    }

    /// Gets an electrician by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Electrician>> {
        let electrician = sqlx::query_as::<_, Electrician>(
            "SELECT id, name, phone, email, is_active, created_at FROM electricians WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(electrician)
    }

    /// Gets an electrician inside an open transaction.
    ///
    /// Assignment reads the assignee in the same transaction that writes
    /// the appointment; it must not acquire a second pool connection.
    pub async fn get_in_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Electrician>> {
        let electrician = sqlx::query_as::<_, Electrician>(
            "SELECT id, name, phone, email, is_active, created_at FROM electricians WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(electrician)
    }

    /// Lists active electricians alphabetically.
    pub async fn list_active(&self) -> DbResult<Vec<Electrician>> {
        let electricians = sqlx::query_as::<_, Electrician>(
            r#"
            SELECT id, name, phone, email, is_active, created_at
            FROM electricians
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(electricians)
    }

    /// Inserts an electrician.
    pub async fn insert(&self, electrician: &Electrician) -> DbResult<()> {
        debug!(name = %electrician.name, "Inserting electrician");

        sqlx::query(
            r#"
            INSERT INTO electricians (id, name, phone, email, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&electrician.id)
        .bind(&electrician.name)
        .bind(&electrician.phone)
        .bind(&electrician.email)
        .bind(electrician.is_active)
        .bind(electrician.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Activates or deactivates an electrician.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE electricians SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Electrician", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

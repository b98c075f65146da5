//! # Appointment Repository
//!
//! Service bookings. The appointment lifecycle shares the guarded-update
//! discipline of orders but is deliberately simpler: no stock, no OTP,
//! no receipt numbering.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use volta_core::{Appointment, AppointmentStatus};

const APPOINTMENT_COLUMNS: &str = "id, customer_name, phone, address, service_type_id, \
     scheduled_date, scheduled_slot, distance_km, visiting_charge_paise, \
     extra_charge_paise, status, assigned_electrician_id, cancellation_reason, \
     created_at, updated_at";

/// Repository for appointment database operations.
#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    pool: SqlitePool,
}

impl AppointmentRepository {
    /// Creates a new AppointmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AppointmentRepository { pool }
    }

    /// Gets an appointment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Appointment>> {
        let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
        let appointment = sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(appointment)
    }

    /// Lists appointments in a given status, soonest visit first.
    pub async fn list_by_status(&self, status: AppointmentStatus) -> DbResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE status = ?1 \
             ORDER BY scheduled_date, scheduled_slot"
        );
        let appointments = sqlx::query_as::<_, Appointment>(&query)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(appointments)
    }

    /// Lists appointments scheduled on a date (the day sheet).
    pub async fn list_by_date(&self, date: NaiveDate) -> DbResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE scheduled_date = ?1 \
             ORDER BY scheduled_slot"
        );
        let appointments = sqlx::query_as::<_, Appointment>(&query)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(appointments)
    }

    // =========================================================================
    // Transactional helpers
    // =========================================================================

    /// Inserts an appointment inside an open transaction.
    pub async fn insert_in_tx(conn: &mut SqliteConnection, appt: &Appointment) -> DbResult<()> {
        debug!(appointment_id = %appt.id, "Inserting appointment");

        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, customer_name, phone, address, service_type_id,
                scheduled_date, scheduled_slot, distance_km,
                visiting_charge_paise, extra_charge_paise, status,
                assigned_electrician_id, cancellation_reason,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&appt.id)
        .bind(&appt.customer_name)
        .bind(&appt.phone)
        .bind(&appt.address)
        .bind(&appt.service_type_id)
        .bind(appt.scheduled_date)
        .bind(&appt.scheduled_slot)
        .bind(appt.distance_km)
        .bind(appt.visiting_charge_paise)
        .bind(appt.extra_charge_paise)
        .bind(appt.status)
        .bind(&appt.assigned_electrician_id)
        .bind(&appt.cancellation_reason)
        .bind(appt.created_at)
        .bind(appt.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Fetches an appointment inside an open transaction.
    pub async fn fetch_for_update(conn: &mut SqliteConnection, id: &str) -> DbResult<Appointment> {
        let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
        let appointment = sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Appointment", id))?;

        Ok(appointment)
    }

    /// Moves an appointment between statuses with a guard on the expected
    /// current status.
    ///
    /// ## Returns
    /// * `Ok(true)` - transition applied
    /// * `Ok(false)` - appointment was no longer in `from`
    pub async fn transition_status(
        conn: &mut SqliteConnection,
        id: &str,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE appointments SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Sets the visiting charge (admin confirmation of an unpriced visit).
    pub async fn set_visiting_charge(
        conn: &mut SqliteConnection,
        id: &str,
        charge_paise: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE appointments SET visiting_charge_paise = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(charge_paise)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Appointment", id));
        }

        Ok(())
    }

    /// Adds to the extra charge (parts, additional labor).
    pub async fn add_extra_charge(
        conn: &mut SqliteConnection,
        id: &str,
        amount_paise: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                extra_charge_paise = extra_charge_paise + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(amount_paise)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Appointment", id));
        }

        Ok(())
    }

    /// Assigns (or reassigns) the field electrician.
    pub async fn assign_electrician(
        conn: &mut SqliteConnection,
        id: &str,
        electrician_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE appointments SET assigned_electrician_id = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(electrician_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Appointment", id));
        }

        Ok(())
    }

    /// Records why an appointment was cancelled.
    pub async fn set_cancellation_reason(
        conn: &mut SqliteConnection,
        id: &str,
        reason: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE appointments SET cancellation_reason = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(reason)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Appointment", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;
    use volta_core::ServiceType;

    async fn seed_service(db: &Database) -> ServiceType {
        let svc = ServiceType {
            id: Uuid::new_v4().to_string(),
            name: "Fan Installation".into(),
            description: None,
            base_visiting_charge_paise: Some(20000),
            charge_upto_500m_paise: None,
            charge_upto_1km_paise: None,
            charge_upto_3km_paise: None,
            charge_upto_5km_paise: None,
            charge_upto_7km_paise: None,
            is_active: true,
            created_at: Utc::now(),
        };
        db.service_types().insert(&svc).await.unwrap();
        svc
    }

    fn appointment(service_type_id: &str) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4().to_string(),
            customer_name: "Ravi Joshi".into(),
            phone: "9876509876".into(),
            address: "45 Palasia".into(),
            service_type_id: service_type_id.into(),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            scheduled_slot: "10:00-12:00".into(),
            distance_km: 2.0,
            visiting_charge_paise: Some(20000),
            extra_charge_paise: 0,
            status: AppointmentStatus::Pending,
            assigned_electrician_id: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert_appointment(db: &Database, a: &Appointment) {
        let mut tx = db.pool().begin().await.unwrap();
        AppointmentRepository::insert_in_tx(tx.as_mut(), a).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let svc = seed_service(&db).await;
        let a = appointment(&svc.id);
        insert_appointment(&db, &a).await;

        let fetched = db.appointments().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, AppointmentStatus::Pending);
        assert_eq!(fetched.visiting_charge_paise, Some(20000));
    }

    #[tokio::test]
    async fn test_guarded_transition_and_extra_charge() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let svc = seed_service(&db).await;
        let a = appointment(&svc.id);
        insert_appointment(&db, &a).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(AppointmentRepository::transition_status(
            tx.as_mut(),
            &a.id,
            AppointmentStatus::Pending,
            AppointmentStatus::Approved
        )
        .await
        .unwrap());
        AppointmentRepository::add_extra_charge(tx.as_mut(), &a.id, 5000)
            .await
            .unwrap();
        AppointmentRepository::add_extra_charge(tx.as_mut(), &a.id, 2500)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let fetched = db.appointments().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, AppointmentStatus::Approved);
        assert_eq!(fetched.extra_charge_paise, 7500);
    }

    #[tokio::test]
    async fn test_day_sheet_listing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let svc = seed_service(&db).await;
        let a = appointment(&svc.id);
        insert_appointment(&db, &a).await;

        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let sheet = db.appointments().list_by_date(date).await.unwrap();
        assert_eq!(sheet.len(), 1);

        let empty = db
            .appointments()
            .list_by_date(NaiveDate::from_ymd_opt(2026, 9, 2).unwrap())
            .await
            .unwrap();
        assert!(empty.is_empty());
    }
}

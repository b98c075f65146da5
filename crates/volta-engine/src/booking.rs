//! # Appointment Booking Service
//!
//! Electrician visit bookings. Fully independent of the order pipeline: no
//! stock, no OTP, no receipt numbering.
//!
//! ## State Machine
//! ```text
//! Pending ──approve──► Approved ──complete──► Completed (terminal)
//!    │                    │
//!    └──────cancel────────┴──────► Cancelled (terminal)
//! ```
//!
//! The visiting charge is computed ONCE, at creation, from the service type's
//! pricing rules; later catalog edits never reprice an existing booking. A
//! charge the rules could not produce (unknown distance, out of bracket
//! range) stays NULL until an admin sets one - and must be set before the
//! appointment can complete.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use volta_core::pricing::visiting_charge;
use volta_core::validation::{validate_amount_paise, validate_phone};
use volta_core::{
    Appointment, AppointmentStatus, CoreError, NotificationEventType, ValidationError,
};
use volta_db::repository::appointment::AppointmentRepository;
use volta_db::repository::audit::AuditRepository;
use volta_db::repository::outbox::NotificationOutboxRepository;
use volta_db::repository::service::ElectricianRepository;
use volta_db::Database;

use crate::context::AuditContext;
use crate::error::{EngineError, EngineResult};
use crate::geocode::{resolve_or_unknown, DistanceResolver};
use crate::notify::outbox_entry;

/// A booking request from the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub service_type_id: String,
    pub scheduled_date: NaiveDate,
    /// Time slot label, e.g. "10:00-12:00".
    pub scheduled_slot: String,
}

/// Books and drives electrician appointments.
#[derive(Clone)]
pub struct BookingService {
    db: Database,
    resolver: Arc<dyn DistanceResolver>,
}

impl BookingService {
    pub fn new(db: Database, resolver: Arc<dyn DistanceResolver>) -> Self {
        BookingService { db, resolver }
    }

    // =========================================================================
    // Book
    // =========================================================================

    /// Books an appointment. The visiting charge is quoted here, once;
    /// a quote the rules could not produce stays unset for the admin.
    pub async fn book_appointment(
        &self,
        ctx: &AuditContext,
        request: BookAppointmentRequest,
    ) -> EngineResult<Appointment> {
        if request.customer_name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "customer_name".to_string(),
            }
            .into());
        }
        validate_phone(&request.phone)?;
        if request.address.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "address".to_string(),
            }
            .into());
        }
        if request.scheduled_slot.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "scheduled_slot".to_string(),
            }
            .into());
        }

        let service_type = self
            .db
            .service_types()
            .get_by_id(&request.service_type_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| EngineError::not_found("ServiceType", &request.service_type_id))?;

        let distance_km = resolve_or_unknown(self.resolver.as_ref(), &request.address).await;
        let quote = visiting_charge(&service_type, distance_km);

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            customer_name: request.customer_name.trim().to_string(),
            phone: request.phone.clone(),
            address: request.address.trim().to_string(),
            service_type_id: service_type.id.clone(),
            scheduled_date: request.scheduled_date,
            scheduled_slot: request.scheduled_slot.clone(),
            distance_km,
            visiting_charge_paise: quote.charge().map(|c| c.paise()),
            extra_charge_paise: 0,
            status: AppointmentStatus::Pending,
            assigned_electrician_id: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;
        AppointmentRepository::insert_in_tx(tx.as_mut(), &appointment).await?;
        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry(
                "appointment.book",
                "appointment",
                &appointment.id,
                Some(format!(
                    "{} on {} ({})",
                    service_type.name, appointment.scheduled_date, appointment.scheduled_slot
                )),
            ),
        )
        .await?;
        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(
            appointment_id = %appointment.id,
            service = %service_type.name,
            "Appointment booked"
        );

        Ok(appointment)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Approves a Pending appointment. `visiting_charge_paise` fills in a
    /// charge the booking rules could not produce; it may also overwrite a
    /// quoted one (the admin has the final word before completion).
    pub async fn approve_appointment(
        &self,
        ctx: &AuditContext,
        appointment_id: &str,
        visiting_charge_paise: Option<i64>,
    ) -> EngineResult<Appointment> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let appointment = AppointmentRepository::fetch_for_update(tx.as_mut(), appointment_id).await?;
        check_transition(&appointment, AppointmentStatus::Approved)?;

        if let Some(paise) = visiting_charge_paise {
            validate_amount_paise("visiting_charge", paise)?;
            AppointmentRepository::set_visiting_charge(tx.as_mut(), appointment_id, paise).await?;
        }

        self.transition(tx.as_mut(), &appointment, AppointmentStatus::Approved).await?;
        self.log_status_change(tx.as_mut(), ctx, &appointment, "appointment.approve").await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;
        self.fetch(appointment_id).await
    }

    /// Completes an Approved appointment. Requires a priced visit: the
    /// visiting charge must have been set (at booking or approval) first.
    pub async fn complete_appointment(
        &self,
        ctx: &AuditContext,
        appointment_id: &str,
    ) -> EngineResult<Appointment> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let appointment = AppointmentRepository::fetch_for_update(tx.as_mut(), appointment_id).await?;
        check_transition(&appointment, AppointmentStatus::Completed)?;

        if appointment.visiting_charge_paise.is_none() {
            return Err(CoreError::InvalidTransition {
                entity: "appointment",
                id: appointment.id.clone(),
                current: "unpriced".to_string(),
                attempted: AppointmentStatus::Completed.to_string(),
            }
            .into());
        }

        self.transition(tx.as_mut(), &appointment, AppointmentStatus::Completed).await?;

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry("appointment.complete", "appointment", appointment_id, None),
        )
        .await?;

        NotificationOutboxRepository::enqueue_in_tx(
            tx.as_mut(),
            &outbox_entry(
                NotificationEventType::AppointmentCompleted,
                &appointment.phone,
                json!({
                    "appointment_id": appointment_id,
                    "visiting_charge_paise": appointment.visiting_charge_paise,
                    "extra_charge_paise": appointment.extra_charge_paise,
                }),
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(%appointment_id, "Appointment completed");
        self.fetch(appointment_id).await
    }

    /// Cancels a Pending or Approved appointment.
    pub async fn cancel_appointment(
        &self,
        ctx: &AuditContext,
        appointment_id: &str,
        reason: &str,
    ) -> EngineResult<Appointment> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let appointment = AppointmentRepository::fetch_for_update(tx.as_mut(), appointment_id).await?;
        check_transition(&appointment, AppointmentStatus::Cancelled)?;

        AppointmentRepository::set_cancellation_reason(tx.as_mut(), appointment_id, reason).await?;
        self.transition(tx.as_mut(), &appointment, AppointmentStatus::Cancelled).await?;
        self.log_status_change(tx.as_mut(), ctx, &appointment, "appointment.cancel").await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;

        info!(%appointment_id, %reason, "Appointment cancelled");
        self.fetch(appointment_id).await
    }

    // =========================================================================
    // Adjustments
    // =========================================================================

    /// Assigns (or reassigns) the field electrician. Allowed until the
    /// appointment reaches a terminal state. Both the customer and the
    /// assignee are notified.
    pub async fn assign_electrician(
        &self,
        ctx: &AuditContext,
        appointment_id: &str,
        electrician_id: &str,
    ) -> EngineResult<Appointment> {
        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let appointment = AppointmentRepository::fetch_for_update(tx.as_mut(), appointment_id).await?;
        if appointment.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                entity: "appointment",
                id: appointment.id.clone(),
                current: appointment.status.to_string(),
                attempted: "assign electrician".to_string(),
            }
            .into());
        }

        let electrician = ElectricianRepository::get_in_tx(tx.as_mut(), electrician_id)
            .await?
            .filter(|e| e.is_active)
            .ok_or_else(|| EngineError::not_found("Electrician", electrician_id))?;

        AppointmentRepository::assign_electrician(tx.as_mut(), appointment_id, electrician_id)
            .await?;

        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry(
                "appointment.assign",
                "appointment",
                appointment_id,
                Some(electrician.name.clone()),
            ),
        )
        .await?;

        let payload = json!({
            "appointment_id": appointment_id,
            "electrician_name": electrician.name,
            "scheduled_date": appointment.scheduled_date.to_string(),
            "scheduled_slot": appointment.scheduled_slot,
        });
        NotificationOutboxRepository::enqueue_in_tx(
            tx.as_mut(),
            &outbox_entry(
                NotificationEventType::ElectricianAssigned,
                &appointment.phone,
                payload.clone(),
            ),
        )
        .await?;
        NotificationOutboxRepository::enqueue_in_tx(
            tx.as_mut(),
            &outbox_entry(
                NotificationEventType::ElectricianAssigned,
                &electrician.phone,
                payload,
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;
        self.fetch(appointment_id).await
    }

    /// Adds an extra charge (parts, additional labor) to a live appointment.
    pub async fn add_extra_charge(
        &self,
        ctx: &AuditContext,
        appointment_id: &str,
        amount_paise: i64,
    ) -> EngineResult<Appointment> {
        if amount_paise <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "extra_charge".to_string(),
            }
            .into());
        }

        let mut tx = self.db.pool().begin().await.map_err(volta_db::DbError::from)?;

        let appointment = AppointmentRepository::fetch_for_update(tx.as_mut(), appointment_id).await?;
        if appointment.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                entity: "appointment",
                id: appointment.id.clone(),
                current: appointment.status.to_string(),
                attempted: "add extra charge".to_string(),
            }
            .into());
        }

        AppointmentRepository::add_extra_charge(tx.as_mut(), appointment_id, amount_paise).await?;
        AuditRepository::log_in_tx(
            tx.as_mut(),
            &ctx.entry(
                "appointment.extra_charge",
                "appointment",
                appointment_id,
                Some(format!("+{amount_paise} paise")),
            ),
        )
        .await?;

        tx.commit().await.map_err(volta_db::DbError::from)?;
        self.fetch(appointment_id).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn transition(
        &self,
        conn: &mut SqliteConnection,
        appointment: &Appointment,
        to: AppointmentStatus,
    ) -> EngineResult<()> {
        let moved =
            AppointmentRepository::transition_status(conn, &appointment.id, appointment.status, to)
                .await?;
        if !moved {
            return Err(EngineError::Conflict(format!(
                "appointment {} left {} concurrently",
                appointment.id, appointment.status
            )));
        }
        Ok(())
    }

    /// Audit entry plus the status-changed notification, same transaction.
    async fn log_status_change(
        &self,
        conn: &mut SqliteConnection,
        ctx: &AuditContext,
        appointment: &Appointment,
        action: &str,
    ) -> EngineResult<()> {
        AuditRepository::log_in_tx(conn, &ctx.entry(action, "appointment", &appointment.id, None))
            .await?;

        NotificationOutboxRepository::enqueue_in_tx(
            conn,
            &outbox_entry(
                NotificationEventType::AppointmentStatusChanged,
                &appointment.phone,
                json!({
                    "appointment_id": appointment.id,
                    "action": action,
                }),
            ),
        )
        .await?;

        Ok(())
    }

    async fn fetch(&self, appointment_id: &str) -> EngineResult<Appointment> {
        self.db
            .appointments()
            .get_by_id(appointment_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Appointment", appointment_id))
    }
}

fn check_transition(appointment: &Appointment, to: AppointmentStatus) -> EngineResult<()> {
    if !appointment.status.can_become(to) {
        return Err(CoreError::InvalidTransition {
            entity: "appointment",
            id: appointment.id.clone(),
            current: appointment.status.to_string(),
            attempted: to.to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Notification Collaborator
//!
//! The engine never sends an SMS or email itself. State transitions queue
//! rows in the notification outbox (same transaction as the change), and the
//! dispatcher hands them to a host-supplied [`Notifier`]. A broken gateway
//! can delay notifications; it can never bounce an order transition.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use volta_core::{NotificationEventType, NotificationOutboxEntry, NotificationStatus};

/// Delivery failures reported by the host's gateway.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification gateway unreachable: {0}")]
    Unreachable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// One notification handed to the gateway.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// Outbox row ID, for correlation in gateway logs.
    pub id: String,
    pub event_type: NotificationEventType,
    /// Phone number (or other host-defined address).
    pub recipient: String,
    /// JSON payload queued with the event.
    pub payload: serde_json::Value,
}

impl NotificationEvent {
    /// Builds the event for an outbox row. An unparsable payload is passed
    /// through as a JSON string rather than dropped.
    pub fn from_outbox(entry: &NotificationOutboxEntry) -> Self {
        let payload = serde_json::from_str(&entry.payload)
            .unwrap_or_else(|_| serde_json::Value::String(entry.payload.clone()));

        NotificationEvent {
            id: entry.id.clone(),
            event_type: entry.event_type,
            recipient: entry.recipient.clone(),
            payload,
        }
    }
}

/// Host-supplied delivery gateway.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Builds a pending outbox row for an event.
pub fn outbox_entry(
    event_type: NotificationEventType,
    recipient: &str,
    payload: serde_json::Value,
) -> NotificationOutboxEntry {
    NotificationOutboxEntry {
        id: Uuid::new_v4().to_string(),
        event_type,
        recipient: recipient.to_string(),
        payload: payload.to_string(),
        status: NotificationStatus::Pending,
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
        attempted_at: None,
        sent_at: None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

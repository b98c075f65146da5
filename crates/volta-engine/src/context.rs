//! # Audit Context
//!
//! Who is performing an operation, in what role, from where. Every mutating
//! service method takes an [`AuditContext`] explicitly - there is no ambient
//! "current user" - so the activity log always knows its actor and the order
//! state machine can enforce role-dependent transitions.

use chrono::Utc;
use uuid::Uuid;

use volta_core::{ActivityLogEntry, ActorRole};

/// The acting principal for one service call.
#[derive(Debug, Clone)]
pub struct AuditContext {
    /// Admin name, customer phone, or "system".
    pub actor: String,
    pub role: ActorRole,
    pub ip_address: Option<String>,
}

impl AuditContext {
    /// A back-office admin acting from the given address.
    pub fn admin(name: impl Into<String>, ip_address: Option<String>) -> Self {
        AuditContext {
            actor: name.into(),
            role: ActorRole::Admin,
            ip_address,
        }
    }

    /// A storefront customer, identified by phone.
    pub fn customer(phone: impl Into<String>, ip_address: Option<String>) -> Self {
        AuditContext {
            actor: phone.into(),
            role: ActorRole::Customer,
            ip_address,
        }
    }

    /// A background job (dispatcher, seeder).
    pub fn system() -> Self {
        AuditContext {
            actor: "system".to_string(),
            role: ActorRole::System,
            ip_address: None,
        }
    }

    /// Builds the activity-log row for an action under this context.
    pub fn entry(
        &self,
        action: &str,
        entity: &str,
        entity_id: &str,
        details: Option<String>,
    ) -> ActivityLogEntry {
        ActivityLogEntry {
            id: Uuid::new_v4().to_string(),
            actor: self.actor.clone(),
            ip_address: self.ip_address.clone(),
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id: Some(entity_id.to_string()),
            details,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

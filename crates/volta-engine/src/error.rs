//! # Engine Error Types
//!
//! The error surface hosts see. Everything below (core rule violations,
//! validation failures, database faults) funnels into [`EngineError`].
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError / ValidationError ──┐                                        │
//! │                                ├──► EngineError                         │
//! │  DbError ──────────────────────┘                                        │
//! │    NotFound         → EngineError::NotFound                             │
//! │    UniqueViolation  → EngineError::Conflict                             │
//! │    Busy             → EngineError::Conflict                             │
//! │    everything else  → EngineError::Db                                   │
//! │                                                                         │
//! │  Sequence allocation treats one Conflict as "lost the race, replay";   │
//! │  a second Conflict surfaces to the caller.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use volta_core::{CoreError, ValidationError};
use volta_db::DbError;

/// Errors returned by volta-engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation (bad transition, OTP mismatch, stock short).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Input rejected before anything was mutated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A uniqueness race was lost or a duplicate row was attempted
    /// (second ledger entry for a date, receipt sequence collision).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external collaborator (geocoder, notification gateway) failed.
    #[error("{service} failed: {message}")]
    External { service: String, message: String },

    /// Financial reporting reads the three ledger tables and nothing else;
    /// an attempt to derive figures from operational data was refused
    /// (and recorded in the financial guard log).
    #[error("Financial reporting reads ledger tables only; refused {attempted}")]
    FinancialIsolation { attempted: String },

    /// Database fault that is not a not-found or a uniqueness race.
    #[error(transparent)]
    Db(DbError),
}

impl EngineError {
    /// Whether this error is a lost uniqueness race / duplicate attempt.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }

    /// Shorthand for a missing entity.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                EngineError::Conflict(format!("duplicate {field}: '{value}'"))
            }
            // A write transaction that lost the SQLite lock is the same
            // shape as a lost uniqueness race: replay against fresh state.
            DbError::Busy(message) => EngineError::Conflict(message),
            other => EngineError::Db(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # Financial Isolation Guard
//!
//! Reporting reads the three ledger tables and nothing else. When a host
//! request asks for figures derived from operational data (order totals,
//! receipt sums), the request is refused and the attempt recorded here, so
//! an operator can see who keeps trying to mix the books.

use chrono::Utc;
use tracing::error;
use uuid::Uuid;

use volta_core::FinancialGuardLogEntry;
use volta_db::repository::audit::AuditRepository;

/// Records refused attempts to derive financial figures from operational
/// rows. The record is written outside any caller transaction on purpose:
/// a violation attempt must stay visible even when the offending request
/// rolls back.
#[derive(Clone)]
pub struct FinancialGuard {
    audit: AuditRepository,
}

impl FinancialGuard {
    pub fn new(audit: AuditRepository) -> Self {
        FinancialGuard { audit }
    }

    /// Records one refused attempt. Logging failures are reported but never
    /// propagated; the refusal itself must not depend on the log write.
    pub async fn record(&self, source: &str, attempted_action: &str, details: Option<String>) {
        let entry = FinancialGuardLogEntry {
            id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            attempted_action: attempted_action.to_string(),
            details,
            created_at: Utc::now(),
        };

        if let Err(err) = self.audit.log_financial_guard(&entry).await {
            error!(%source, %attempted_action, error = %err, "Failed to record guard violation");
        }
    }
}

//! Subscription Invariants Module
//!
//! Provides runnable consistency checks for account subscription state.
//! These can be run after any webhook burst or support intervention to
//! ensure the system is in a valid state.
//!
//! ## Design Principles
//!
//! 1. **Executable**: Each invariant is a real SQL query that can be run
//! 2. **Explanatory**: Violations include enough context to debug
//! 3. **Non-destructive**: Checks only read, never write

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::BillingResult;

/// Result of running a single invariant check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Which invariant was violated
    pub invariant: String,
    /// Account(s) affected
    pub account_ids: Vec<Uuid>,
    /// Human-readable description of the violation
    pub description: String,
    /// Additional context for debugging
    pub context: serde_json::Value,
    /// Severity level
    pub severity: ViolationSeverity,
}

/// Severity of an invariant violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Critical - accounts may have wrong access
    Critical,
    /// High - data inconsistency that needs attention
    High,
    /// Medium - potential issue, should investigate
    Medium,
    /// Low - minor inconsistency, informational
    Low,
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationSeverity::Critical => write!(f, "CRITICAL"),
            ViolationSeverity::High => write!(f, "HIGH"),
            ViolationSeverity::Medium => write!(f, "MEDIUM"),
            ViolationSeverity::Low => write!(f, "LOW"),
        }
    }
}

/// Summary of all invariant checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantCheckSummary {
    /// When the check was run
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
    /// Total number of checks run
    pub checks_run: usize,
    /// Number of checks that passed
    pub checks_passed: usize,
    /// Number of checks that failed
    pub checks_failed: usize,
    /// List of all violations found
    pub violations: Vec<InvariantViolation>,
    /// Overall health status
    pub healthy: bool,
}

/// Row type for accounts with a missing end date
#[derive(Debug, sqlx::FromRow)]
struct MissingEndDateRow {
    account_id: Uuid,
    email: String,
    subscription_status: String,
}

/// Row type for stale trialing accounts
#[derive(Debug, sqlx::FromRow)]
struct StaleTrialRow {
    account_id: Uuid,
    email: String,
    subscription_ends_at: Option<OffsetDateTime>,
}

/// Row type for invoiced briefs without an invoice
#[derive(Debug, sqlx::FromRow)]
struct OrphanedInvoicedBriefRow {
    brief_id: Uuid,
    account_id: Uuid,
    title: String,
}

/// Service for running subscription invariant checks
pub struct InvariantChecker {
    pool: PgPool,
}

impl InvariantChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all invariant checks and return summary
    pub async fn run_all_checks(&self) -> BillingResult<InvariantCheckSummary> {
        let now = OffsetDateTime::now_utc();
        let mut violations = Vec::new();

        violations.extend(self.check_trialing_has_end_date().await?);
        violations.extend(self.check_no_stale_trials().await?);
        violations.extend(self.check_pro_has_end_date().await?);
        violations.extend(self.check_invoiced_briefs_have_invoice().await?);

        let checks_run = 4;
        let checks_failed = violations
            .iter()
            .map(|v| &v.invariant)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let checks_passed = checks_run - checks_failed;

        Ok(InvariantCheckSummary {
            checked_at: now,
            checks_run,
            checks_passed,
            checks_failed,
            healthy: violations.is_empty(),
            violations,
        })
    }

    /// Invariant 1: trialing accounts carry an end date
    ///
    /// A trial without an end date can never expire, which would grant
    /// pro-equivalent limits forever.
    async fn check_trialing_has_end_date(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<MissingEndDateRow> = sqlx::query_as(
            r#"
            SELECT id as account_id, email, subscription_status
            FROM accounts
            WHERE subscription_status = 'trialing'
              AND subscription_ends_at IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "trialing_has_end_date".to_string(),
                account_ids: vec![row.account_id],
                description: format!("Trialing account '{}' has no trial end date", row.email),
                context: serde_json::json!({
                    "email": row.email,
                    "subscription_status": row.subscription_status,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 2: no trial stays expired for more than a day
    ///
    /// Expired trials are reconciled lazily on first touch; one that has
    /// been stale for over 24 hours belongs to an account nothing has
    /// touched. Not an access bug (the gate resolves it as free either
    /// way), but the stored status is misleading to other readers.
    async fn check_no_stale_trials(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<StaleTrialRow> = sqlx::query_as(
            r#"
            SELECT id as account_id, email, subscription_ends_at
            FROM accounts
            WHERE subscription_status = 'trialing'
              AND subscription_ends_at < NOW() - INTERVAL '24 hours'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "no_stale_trials".to_string(),
                account_ids: vec![row.account_id],
                description: format!(
                    "Account '{}' is still stored as trialing after its trial ended",
                    row.email
                ),
                context: serde_json::json!({
                    "email": row.email,
                    "subscription_ends_at": row.subscription_ends_at.map(|t| t.to_string()),
                }),
                severity: ViolationSeverity::Medium,
            })
            .collect())
    }

    /// Invariant 3: pro accounts carry an end date
    ///
    /// Only the payment flow sets `pro`, and it always stamps an end
    /// date; a pro account without one was mutated outside that flow.
    async fn check_pro_has_end_date(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<MissingEndDateRow> = sqlx::query_as(
            r#"
            SELECT id as account_id, email, subscription_status
            FROM accounts
            WHERE subscription_status = 'pro'
              AND subscription_ends_at IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "pro_has_end_date".to_string(),
                account_ids: vec![row.account_id],
                description: format!("Pro account '{}' has no subscription end date", row.email),
                context: serde_json::json!({
                    "email": row.email,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 4: every invoiced brief has its invoice row
    ///
    /// Brief conversion writes the brief status and the invoice in one
    /// transaction; a mismatch means that transaction was bypassed.
    async fn check_invoiced_briefs_have_invoice(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<OrphanedInvoicedBriefRow> = sqlx::query_as(
            r#"
            SELECT b.id as brief_id, b.account_id, b.title
            FROM briefs b
            WHERE b.status = 'invoiced'
              AND NOT EXISTS (SELECT 1 FROM invoices i WHERE i.brief_id = b.id)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "invoiced_briefs_have_invoice".to_string(),
                account_ids: vec![row.account_id],
                description: format!(
                    "Brief '{}' is marked invoiced but has no invoice row",
                    row.title
                ),
                context: serde_json::json!({
                    "brief_id": row.brief_id,
                    "title": row.title,
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Run a single invariant check by name
    pub async fn run_check(&self, name: &str) -> BillingResult<Vec<InvariantViolation>> {
        match name {
            "trialing_has_end_date" => self.check_trialing_has_end_date().await,
            "no_stale_trials" => self.check_no_stale_trials().await,
            "pro_has_end_date" => self.check_pro_has_end_date().await,
            "invoiced_briefs_have_invoice" => self.check_invoiced_briefs_have_invoice().await,
            _ => Ok(vec![]),
        }
    }

    /// Get list of all available invariant checks
    pub fn available_checks() -> Vec<&'static str> {
        vec![
            "trialing_has_end_date",
            "no_stale_trials",
            "pro_has_end_date",
            "invoiced_briefs_have_invoice",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_severity_display() {
        assert_eq!(ViolationSeverity::Critical.to_string(), "CRITICAL");
        assert_eq!(ViolationSeverity::High.to_string(), "HIGH");
        assert_eq!(ViolationSeverity::Medium.to_string(), "MEDIUM");
        assert_eq!(ViolationSeverity::Low.to_string(), "LOW");
    }

    #[test]
    fn test_available_checks() {
        let checks = InvariantChecker::available_checks();
        assert_eq!(checks.len(), 4);
        assert!(checks.contains(&"trialing_has_end_date"));
        assert!(checks.contains(&"invoiced_briefs_have_invoice"));
    }
}

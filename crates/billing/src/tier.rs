//! Plan tier resolution
//!
//! Resolves an account's effective tier from its stored subscription
//! status and end date. An account is `Pro` only while the end date is in
//! the future; the stored status alone is never trusted.
//!
//! Expired trials are reconciled lazily here: there is no background job,
//! so the first gate evaluation that touches an expired trial persists
//! the downgrade. The write is a conditional UPDATE guarded on the stale
//! state, so a second resolution immediately afterwards matches zero rows
//! and issues no redundant write. Callers must tolerate this write on an
//! otherwise read-like path.

use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use sheet2bill_shared::{PlanTier, SubscriptionStatus};

use crate::error::{BillingError, BillingResult};

/// Outcome of resolving an account's tier
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTier {
    pub tier: PlanTier,
    /// Stored status after reconciliation
    pub status: SubscriptionStatus,
    pub ends_at: Option<OffsetDateTime>,
    /// Whether this resolution persisted a trial downgrade
    pub downgraded: bool,
}

#[derive(Debug, FromRow)]
struct AccountRow {
    subscription_status: String,
    subscription_ends_at: Option<OffsetDateTime>,
}

/// Resolves effective tiers, reconciling expired trials as it goes
#[derive(Clone)]
pub struct TierResolver {
    pool: PgPool,
}

impl TierResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve the effective tier for `account_id` at instant `now`.
    ///
    /// Fails with [`BillingError::AccountNotFound`] if the account row is
    /// missing; the gate never falls back to a default tier.
    pub async fn resolve(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> BillingResult<ResolvedTier> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT subscription_status, subscription_ends_at FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(BillingError::AccountNotFound(account_id))?;

        let status: SubscriptionStatus = row.subscription_status.parse().map_err(|_| {
            BillingError::InvalidSubscriptionStatus {
                account_id,
                value: row.subscription_status.clone(),
            }
        })?;

        let subscription_active = row
            .subscription_ends_at
            .map(|ends_at| ends_at > now)
            .unwrap_or(false);

        if status == SubscriptionStatus::Trialing && !subscription_active {
            let downgraded = self.downgrade_expired_trial(account_id, now).await?;
            return Ok(ResolvedTier {
                tier: PlanTier::Free,
                status: SubscriptionStatus::Free,
                ends_at: row.subscription_ends_at,
                downgraded,
            });
        }

        let tier = match status {
            SubscriptionStatus::Pro | SubscriptionStatus::Trialing if subscription_active => {
                PlanTier::Pro
            }
            _ => PlanTier::Free,
        };

        Ok(ResolvedTier {
            tier,
            status,
            ends_at: row.subscription_ends_at,
            downgraded: false,
        })
    }

    /// Persist the free downgrade for an expired trial.
    ///
    /// The WHERE clause re-checks the stale state, so concurrent
    /// resolutions and repeat calls are no-ops (zero rows matched).
    async fn downgrade_expired_trial(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> BillingResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET subscription_status = 'free', updated_at = NOW()
            WHERE id = $1
              AND subscription_status = 'trialing'
              AND (subscription_ends_at IS NULL OR subscription_ends_at <= $2)
            "#,
        )
        .bind(account_id)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            // Another request already reconciled this account
            return Ok(false);
        }

        tracing::info!(
            account_id = %account_id,
            "Trial expired, downgraded account to free"
        );

        // Audit trail is best-effort; the downgrade itself already landed
        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO account_status_audit (account_id, from_status, to_status, source)
            VALUES ($1, 'trialing', 'free', 'trial_expiry')
            "#,
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        {
            tracing::warn!(account_id = %account_id, error = %e, "Failed to record downgrade audit");
        }

        Ok(true)
    }
}

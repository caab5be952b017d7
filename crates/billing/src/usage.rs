//! Quota counters
//!
//! Usage is recomputed on every gate evaluation, never cached. `clients`
//! and `items` are lifetime counts; `briefs` and `inquiries` are counted
//! from the first midnight of the current calendar month (UTC). Inquiries
//! count rows where the account is the recipient, not the creator.

use serde::Serialize;
use sqlx::PgPool;
use time::{OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::error::BillingResult;
use crate::plan::ResourceKind;

/// First instant of the calendar month containing `now`.
///
/// The window comparison downstream is `created_at >= start`, so a row
/// stamped exactly at the first midnight of a month belongs to that
/// month, not the previous one.
pub fn month_window_start(now: OffsetDateTime) -> OffsetDateTime {
    // Day 1 exists in every month; the fallback is unreachable
    let first_day = now.date().replace_day(1).unwrap_or_else(|_| now.date());
    PrimitiveDateTime::new(first_day, Time::MIDNIGHT).assume_utc()
}

/// Current usage across all four kinds, for the subscription endpoint
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UsageSummary {
    pub clients: i64,
    pub briefs_this_month: i64,
    pub items: i64,
    pub inquiries_this_month: i64,
}

impl UsageSummary {
    pub fn count_for(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Clients => self.clients,
            ResourceKind::Briefs => self.briefs_this_month,
            ResourceKind::Items => self.items,
            ResourceKind::Inquiries => self.inquiries_this_month,
        }
    }
}

/// Computes per-kind usage counts for one account
#[derive(Clone)]
pub struct UsageCounter {
    pool: PgPool,
}

impl UsageCounter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count current usage of `kind` for `account_id` at instant `now`.
    ///
    /// A failed query propagates as an error; it is never coerced to
    /// zero, since zero would allow operations past the real limit.
    pub async fn count(
        &self,
        account_id: Uuid,
        kind: ResourceKind,
        now: OffsetDateTime,
    ) -> BillingResult<i64> {
        let count = match kind {
            ResourceKind::Clients => {
                sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE account_id = $1")
                    .bind(account_id)
                    .fetch_one(&self.pool)
                    .await?
            }
            ResourceKind::Items => {
                sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE account_id = $1")
                    .bind(account_id)
                    .fetch_one(&self.pool)
                    .await?
            }
            ResourceKind::Briefs => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM briefs WHERE account_id = $1 AND created_at >= $2",
                )
                .bind(account_id)
                .bind(month_window_start(now))
                .fetch_one(&self.pool)
                .await?
            }
            ResourceKind::Inquiries => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM inquiries WHERE recipient_id = $1 AND created_at >= $2",
                )
                .bind(account_id)
                .bind(month_window_start(now))
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(count)
    }

    /// All four counters in one pass, for usage meters in the client app
    pub async fn summary(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> BillingResult<UsageSummary> {
        Ok(UsageSummary {
            clients: self.count(account_id, ResourceKind::Clients, now).await?,
            briefs_this_month: self.count(account_id, ResourceKind::Briefs, now).await?,
            items: self.count(account_id, ResourceKind::Items, now).await?,
            inquiries_this_month: self
                .count(account_id, ResourceKind::Inquiries, now)
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn window_start_truncates_to_first_midnight() {
        let now = datetime!(2025-07-19 14:32:05 UTC);
        assert_eq!(month_window_start(now), datetime!(2025-07-01 00:00:00 UTC));
    }

    #[test]
    fn window_start_is_identity_at_month_open() {
        let boundary = datetime!(2025-08-01 00:00:00 UTC);
        assert_eq!(month_window_start(boundary), boundary);
    }

    #[test]
    fn window_start_handles_december() {
        let now = datetime!(2024-12-31 23:59:59.999 UTC);
        assert_eq!(month_window_start(now), datetime!(2024-12-01 00:00:00 UTC));
    }

    #[test]
    fn row_at_month_open_belongs_to_new_window() {
        // The counting queries use `created_at >= start`
        let august_start = month_window_start(datetime!(2025-08-15 12:00:00 UTC));

        let at_boundary = datetime!(2025-08-01 00:00:00 UTC);
        let just_before = datetime!(2025-07-31 23:59:59.999 UTC);

        assert!(at_boundary >= august_start, "included in the current month");
        assert!(just_before < august_start, "excluded from the current month");
    }
}

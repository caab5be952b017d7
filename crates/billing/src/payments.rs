//! Payment provider webhook handling
//!
//! The payment gateway is an external collaborator that POSTs signed
//! events. This module verifies the signature, deduplicates events, and
//! applies `payment_succeeded` by extending the subscription: the new end
//! date stacks on top of whatever unexpired time remains.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::PgPool;
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

type HmacSha256 = Hmac<Sha256>;

/// Signed timestamps older than this are rejected
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// One confirmed payment buys this much subscription time
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 30;

/// Parsed webhook event payload
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub account_id: Uuid,
}

/// Outcome of processing one webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Subscription extended to the given end date
    Applied { ends_at: OffsetDateTime },
    /// Event id was seen before; nothing done
    AlreadyProcessed,
    /// Event type carries no subscription effect; recorded and skipped
    Ignored,
}

/// New subscription end after a confirmed payment.
///
/// Remaining unexpired time is kept: the period is added to the current
/// end date if it is still in the future, otherwise to `now`.
pub fn stack_subscription(current: Option<OffsetDateTime>, now: OffsetDateTime) -> OffsetDateTime {
    let base = current.filter(|ends_at| *ends_at > now).unwrap_or(now);
    base + Duration::days(SUBSCRIPTION_PERIOD_DAYS)
}

/// Verifies and applies payment provider webhooks
pub struct PaymentService {
    pool: PgPool,
    webhook_secret: String,
}

impl PaymentService {
    pub fn new(pool: PgPool, webhook_secret: impl Into<String>) -> Self {
        Self {
            pool,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify the `t=<unix>,v1=<hex>` signature header against the raw
    /// request body
    pub fn verify_signature(&self, payload: &str, signature: &str) -> BillingResult<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.verify_signature_at(payload, signature, now)
    }

    pub(crate) fn verify_signature_at(
        &self,
        payload: &str,
        signature: &str,
        now: i64,
    ) -> BillingResult<()> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<&str> = None;

        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => v1_signature = Some(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            tracing::warn!("Webhook signature header missing timestamp");
            BillingError::WebhookSignatureInvalid
        })?;
        let v1_signature = v1_signature.ok_or_else(|| {
            tracing::warn!("Webhook signature header missing v1 signature");
            BillingError::WebhookSignatureInvalid
        })?;

        if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            tracing::warn!(
                timestamp = timestamp,
                now = now,
                "Webhook timestamp outside tolerance"
            );
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| BillingError::WebhookSignatureInvalid)?;
        mac.update(signed_payload.as_bytes());
        let computed = mac.finalize().into_bytes();

        let received = hex::decode(v1_signature).map_err(|_| {
            tracing::warn!("Webhook v1 signature is not valid hex");
            BillingError::WebhookSignatureInvalid
        })?;

        if computed.as_slice().ct_eq(received.as_slice()).unwrap_u8() != 1 {
            tracing::warn!("Webhook signature mismatch");
            return Err(BillingError::WebhookSignatureInvalid);
        }

        Ok(())
    }

    /// Parse a verified payload into an event
    pub fn parse_event(payload: &str) -> BillingResult<PaymentEvent> {
        serde_json::from_str(payload).map_err(|e| BillingError::WebhookPayloadInvalid(e.to_string()))
    }

    /// Process one event, exactly once.
    ///
    /// The event id is claimed atomically with
    /// `INSERT ... ON CONFLICT DO NOTHING RETURNING`; a redelivery finds
    /// the row already present and is skipped without error.
    pub async fn handle_event(&self, event: &PaymentEvent) -> BillingResult<PaymentOutcome> {
        let claimed: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO payment_events (event_id, event_type, account_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            RETURNING event_id
            "#,
        )
        .bind(&event.id)
        .bind(&event.event_type)
        .bind(event.account_id)
        .fetch_optional(&self.pool)
        .await?;

        if claimed.is_none() {
            tracing::info!(event_id = %event.id, "Webhook event already processed, skipping");
            return Ok(PaymentOutcome::AlreadyProcessed);
        }

        let result = match event.event_type.as_str() {
            "payment_succeeded" => self
                .apply_payment(event.account_id)
                .await
                .map(|ends_at| PaymentOutcome::Applied { ends_at }),
            other => {
                tracing::debug!(event_id = %event.id, event_type = %other, "Ignoring webhook event type");
                Ok(PaymentOutcome::Ignored)
            }
        };

        if result.is_err() {
            // Release the claim so the provider's retry can reprocess
            if let Err(e) = sqlx::query("DELETE FROM payment_events WHERE event_id = $1")
                .bind(&event.id)
                .execute(&self.pool)
                .await
            {
                tracing::error!(event_id = %event.id, error = %e, "Failed to release webhook claim");
            }
        }

        result
    }

    /// Extend the subscription and mark the account `pro`
    async fn apply_payment(&self, account_id: Uuid) -> BillingResult<OffsetDateTime> {
        let now = OffsetDateTime::now_utc();

        let row: Option<(String, Option<OffsetDateTime>)> = sqlx::query_as(
            "SELECT subscription_status, subscription_ends_at FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        let (previous_status, current_ends_at) =
            row.ok_or(BillingError::AccountNotFound(account_id))?;

        let new_ends_at = stack_subscription(current_ends_at, now);

        sqlx::query(
            r#"
            UPDATE accounts
            SET subscription_status = 'pro',
                subscription_ends_at = $2,
                plan_type = 'pro',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(new_ends_at)
        .execute(&self.pool)
        .await?;

        if previous_status != "pro" {
            if let Err(e) = sqlx::query(
                r#"
                INSERT INTO account_status_audit (account_id, from_status, to_status, source)
                VALUES ($1, $2, 'pro', 'payment_webhook')
                "#,
            )
            .bind(account_id)
            .bind(&previous_status)
            .execute(&self.pool)
            .await
            {
                tracing::warn!(account_id = %account_id, error = %e, "Failed to record upgrade audit");
            }
        }

        tracing::info!(
            account_id = %account_id,
            ends_at = %new_ends_at,
            "Payment confirmed, subscription extended"
        );

        Ok(new_ends_at)
    }
}

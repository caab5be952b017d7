//! Billing routes
//!
//! The webhook endpoint is the payment provider's entry point; the
//! subscription endpoint backs the client app's plan page and upgrade
//! prompts; the invariants endpoint gives operators a health read.

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use time::OffsetDateTime;

use sheet2bill_billing::{
    InvariantChecker, PaymentOutcome, PaymentService, QuotaLimit, ResourceKind,
};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Header carrying the webhook signature (`t=<unix>,v1=<hex>`)
const SIGNATURE_HEADER: &str = "webhook-signature";

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub outcome: &'static str,
}

/// Payment provider webhook.
///
/// Takes the raw body so the signature is computed over exactly the
/// bytes the provider signed.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    state.payments.verify_signature(&body, signature)?;

    let event = PaymentService::parse_event(&body)?;
    let outcome = state.payments.handle_event(&event).await?;

    let outcome = match outcome {
        PaymentOutcome::Applied { .. } => "applied",
        PaymentOutcome::AlreadyProcessed => "already_processed",
        PaymentOutcome::Ignored => "ignored",
    };

    Ok(Json(WebhookResponse {
        received: true,
        outcome,
    }))
}

#[derive(Debug, Serialize)]
pub struct QuotaStatus {
    pub used: i64,
    /// `null` means unlimited
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub tier: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    pub clients: QuotaStatus,
    pub briefs_this_month: QuotaStatus,
    pub items: QuotaStatus,
    pub inquiries_this_month: QuotaStatus,
    pub custom_branding: bool,
    pub custom_invoice_numbers: bool,
}

/// Current tier, usage, and limits for the authenticated account.
///
/// Resolving the tier here runs the same lazy trial reconciliation the
/// gate performs, so the plan page always shows post-expiry state.
pub async fn subscription_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let now = OffsetDateTime::now_utc();

    let resolved = state.gate.resolver().resolve(user.account_id, now).await?;
    let usage = state.gate.usage().summary(user.account_id, now).await?;

    let plans = state.gate.plans();
    let definition = plans.definition(resolved.tier);

    let quota = |kind: ResourceKind| QuotaStatus {
        used: usage.count_for(kind),
        limit: match definition.limits.limit_for(kind) {
            QuotaLimit::Capped(cap) => Some(cap),
            QuotaLimit::Unlimited => None,
        },
    };

    Ok(Json(SubscriptionResponse {
        tier: resolved.tier.to_string(),
        status: resolved.status.to_string(),
        ends_at: resolved.ends_at,
        clients: quota(ResourceKind::Clients),
        briefs_this_month: quota(ResourceKind::Briefs),
        items: quota(ResourceKind::Items),
        inquiries_this_month: quota(ResourceKind::Inquiries),
        custom_branding: definition.features.custom_branding,
        custom_invoice_numbers: definition.features.custom_invoice_numbers,
    }))
}

/// Run the subscription consistency checks
pub async fn run_invariants(
    State(state): State<AppState>,
) -> ApiResult<Json<sheet2bill_billing::InvariantCheckSummary>> {
    let checker = InvariantChecker::new(state.pool.clone());
    let summary = checker.run_all_checks().await?;

    if !summary.healthy {
        tracing::warn!(
            violations = summary.violations.len(),
            "Subscription invariant violations found"
        );
    }

    Ok(Json(summary))
}

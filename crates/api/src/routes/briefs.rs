//! Brief routes
//!
//! A brief is a pre-invoice work summary. Lifecycle:
//! `draft` → `sent` → `approved`/`declined` → `invoiced`.
//!
//! Creation is quota-bounded per calendar month. Approval and decline
//! are public routes keyed by the brief's approval token, since the
//! client receiving the brief has no Sheet2Bill account.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use sheet2bill_billing::{Decision, GateAction};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateBriefRequest {
    pub client_id: Uuid,
    pub title: String,
    pub currency: Option<String>,
    pub total_cents: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct BriefResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub currency: String,
    pub total_cents: i64,
    pub status: String,
    pub approval_token: Uuid,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize, FromRow)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub brief_id: Uuid,
    pub number: i64,
    pub total_cents: i64,
    pub currency: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

pub async fn create_brief(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateBriefRequest>,
) -> ApiResult<(StatusCode, Json<BriefResponse>)> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Brief title is required".to_string()));
    }
    if req.total_cents < 0 {
        return Err(ApiError::Validation("Total cannot be negative".to_string()));
    }

    // The brief must reference one of the caller's own clients
    let client_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1 AND account_id = $2)",
    )
    .bind(req.client_id)
    .bind(user.account_id)
    .fetch_one(&state.pool)
    .await?;

    if !client_exists {
        return Err(ApiError::NotFound("Client not found".to_string()));
    }

    match state
        .gate
        .check(user.account_id, GateAction::CreateBrief)
        .await?
    {
        Decision::Allowed => {}
        Decision::Denied { message } => return Err(ApiError::LimitExceeded(message)),
    }

    let currency = req.currency.unwrap_or_else(|| "EUR".to_string());

    let brief: BriefResponse = sqlx::query_as(
        r#"
        INSERT INTO briefs (account_id, client_id, title, currency, total_cents, status, approval_token)
        VALUES ($1, $2, $3, $4, $5, 'draft', $6)
        RETURNING id, client_id, title, currency, total_cents, status, approval_token,
                  approved_at, created_at
        "#,
    )
    .bind(user.account_id)
    .bind(req.client_id)
    .bind(title)
    .bind(&currency)
    .bind(req.total_cents)
    .bind(Uuid::new_v4())
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(account_id = %user.account_id, brief_id = %brief.id, "Created brief");

    Ok((StatusCode::CREATED, Json(brief)))
}

pub async fn list_briefs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<BriefResponse>>> {
    let briefs: Vec<BriefResponse> = sqlx::query_as(
        r#"
        SELECT id, client_id, title, currency, total_cents, status, approval_token,
               approved_at, created_at
        FROM briefs
        WHERE account_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.account_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(briefs))
}

/// Mark a draft brief as sent to the client for approval.
/// Delivery of the approval link is the email collaborator's job.
pub async fn send_brief(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(brief_id): Path<Uuid>,
) -> ApiResult<Json<BriefResponse>> {
    let brief: Option<BriefResponse> = sqlx::query_as(
        r#"
        UPDATE briefs
        SET status = 'sent', updated_at = NOW()
        WHERE id = $1 AND account_id = $2 AND status = 'draft'
        RETURNING id, client_id, title, currency, total_cents, status, approval_token,
                  approved_at, created_at
        "#,
    )
    .bind(brief_id)
    .bind(user.account_id)
    .fetch_optional(&state.pool)
    .await?;

    match brief {
        Some(brief) => {
            tracing::info!(account_id = %user.account_id, brief_id = %brief_id, "Brief sent for approval");
            Ok(Json(brief))
        }
        None => {
            let err = brief_transition_error(&state, brief_id, user.account_id, "sent").await?;
            Err(err)
        }
    }
}

/// Public: the client approves a brief via the token from their email
pub async fn approve_brief(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    resolve_brief_by_token(&state, token, "approved").await
}

/// Public: the client declines a brief via the token from their email
pub async fn decline_brief(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    resolve_brief_by_token(&state, token, "declined").await
}

async fn resolve_brief_by_token(
    state: &AppState,
    token: Uuid,
    new_status: &str,
) -> ApiResult<Json<serde_json::Value>> {
    let updated: Option<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE briefs
        SET status = $2,
            approved_at = CASE WHEN $2 = 'approved' THEN NOW() ELSE approved_at END,
            updated_at = NOW()
        WHERE approval_token = $1 AND status = 'sent'
        RETURNING id
        "#,
    )
    .bind(token)
    .bind(new_status)
    .fetch_optional(&state.pool)
    .await?;

    match updated {
        Some((brief_id,)) => {
            tracing::info!(brief_id = %brief_id, status = %new_status, "Client resolved brief");
            Ok(Json(serde_json::json!({ "status": new_status })))
        }
        // Public route: don't reveal whether the token exists at all
        None => Err(ApiError::NotFound(
            "This link is no longer valid".to_string(),
        )),
    }
}

/// Convert an approved brief into an invoice.
///
/// The brief status flip and the invoice insert share one transaction;
/// the per-account invoice number is allocated under that transaction
/// and the unique (account_id, number) constraint backstops races.
pub async fn convert_to_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(brief_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<InvoiceResponse>)> {
    let mut tx = state.pool.begin().await?;

    let brief: Option<(String, i64, String)> = sqlx::query_as(
        r#"
        SELECT status, total_cents, currency
        FROM briefs
        WHERE id = $1 AND account_id = $2
        FOR UPDATE
        "#,
    )
    .bind(brief_id)
    .bind(user.account_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (status, total_cents, currency) =
        brief.ok_or_else(|| ApiError::NotFound("Brief not found".to_string()))?;

    if status != "approved" {
        return Err(ApiError::Conflict(format!(
            "Only approved briefs can be invoiced (current status: {status})"
        )));
    }

    let next_number: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(number), 0) + 1 FROM invoices WHERE account_id = $1",
    )
    .bind(user.account_id)
    .fetch_one(&mut *tx)
    .await?;

    let invoice: InvoiceResponse = sqlx::query_as(
        r#"
        INSERT INTO invoices (account_id, brief_id, number, total_cents, currency)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, brief_id, number, total_cents, currency, issued_at
        "#,
    )
    .bind(user.account_id)
    .bind(brief_id)
    .bind(next_number)
    .bind(total_cents)
    .bind(&currency)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE briefs SET status = 'invoiced', updated_at = NOW() WHERE id = $1")
        .bind(brief_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        account_id = %user.account_id,
        brief_id = %brief_id,
        invoice_id = %invoice.id,
        number = invoice.number,
        "Converted brief to invoice"
    );

    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Build the right error for a failed status transition: distinguish a
/// missing brief from one in the wrong state.
async fn brief_transition_error(
    state: &AppState,
    brief_id: Uuid,
    account_id: Uuid,
    target: &str,
) -> Result<ApiError, ApiError> {
    let current: Option<(String,)> =
        sqlx::query_as("SELECT status FROM briefs WHERE id = $1 AND account_id = $2")
            .bind(brief_id)
            .bind(account_id)
            .fetch_optional(&state.pool)
            .await?;

    Ok(match current {
        Some((status,)) => ApiError::Conflict(format!(
            "Brief cannot be marked {target} from status '{status}'"
        )),
        None => ApiError::NotFound("Brief not found".to_string()),
    })
}

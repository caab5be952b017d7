//! Inquiry routes
//!
//! The public inquiry form lets anyone contact a freelancer by handle.
//! Receiving an inquiry is quota-bounded against the *recipient*, and
//! the denial shown to the submitter must not leak the recipient's plan
//! or billing situation.

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
pub struct SubmitInquiryRequest {
    pub sender_name: String,
    pub sender_email: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InquiryReceipt {
    pub id: Uuid,
}

#[derive(Debug, Serialize, FromRow)]
pub struct InquiryResponse {
    pub id: Uuid,
    pub sender_name: String,
    pub sender_email: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Public: submit an inquiry to the freelancer behind `handle`
pub async fn submit_inquiry(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Json(req): Json<SubmitInquiryRequest>,
) -> ApiResult<(StatusCode, Json<InquiryReceipt>)> {
    if req.sender_name.trim().is_empty() || req.message.trim().is_empty() {
        return Err(ApiError::Validation(
            "Name and message are required".to_string(),
        ));
    }
    if !req.sender_email.contains('@') {
        return Err(ApiError::Validation(
            "A valid email address is required".to_string(),
        ));
    }

    let recipient: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM accounts WHERE handle = $1")
        .bind(&handle)
        .fetch_optional(&state.pool)
        .await?;

    let (recipient_id,) =
        recipient.ok_or_else(|| ApiError::NotFound("This page doesn't exist".to_string()))?;

    match state
        .gate
        .check(recipient_id, GateAction::ReceiveInquiry)
        .await?
    {
        Decision::Allowed => {}
        // Public-facing message; carries no plan or billing detail
        Decision::Denied { message } => return Err(ApiError::LimitExceeded(message)),
    }

    let (inquiry_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO inquiries (recipient_id, sender_name, sender_email, message)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(recipient_id)
    .bind(req.sender_name.trim())
    .bind(req.sender_email.trim())
    .bind(req.message.trim())
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(recipient_id = %recipient_id, inquiry_id = %inquiry_id, "Received inquiry");

    Ok((StatusCode::CREATED, Json(InquiryReceipt { id: inquiry_id })))
}

/// The recipient's inbox
pub async fn list_inquiries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<InquiryResponse>>> {
    let inquiries: Vec<InquiryResponse> = sqlx::query_as(
        r#"
        SELECT id, sender_name, sender_email, message, created_at
        FROM inquiries
        WHERE recipient_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.account_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(inquiries))
}

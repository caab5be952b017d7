//! Line-item library routes
//!
//! Saved items are reusable billables a freelancer drops into briefs.
//! Creation is quota-bounded (lifetime cap).

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
pub struct CreateItemRequest {
    pub description: String,
    pub unit_price_cents: i64,
    /// Billing unit, e.g. "hour", "day", "project"
    pub unit: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ItemResponse {
    pub id: Uuid,
    pub description: String,
    pub unit_price_cents: i64,
    pub unit: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<ItemResponse>)> {
    let description = req.description.trim();
    if description.is_empty() {
        return Err(ApiError::Validation(
            "Item description is required".to_string(),
        ));
    }
    if req.unit_price_cents < 0 {
        return Err(ApiError::Validation(
            "Unit price cannot be negative".to_string(),
        ));
    }

    match state
        .gate
        .check(user.account_id, GateAction::CreateItem)
        .await?
    {
        Decision::Allowed => {}
        Decision::Denied { message } => return Err(ApiError::LimitExceeded(message)),
    }

    let item: ItemResponse = sqlx::query_as(
        r#"
        INSERT INTO items (account_id, description, unit_price_cents, unit)
        VALUES ($1, $2, $3, $4)
        RETURNING id, description, unit_price_cents, unit, created_at
        "#,
    )
    .bind(user.account_id)
    .bind(description)
    .bind(req.unit_price_cents)
    .bind(&req.unit)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(account_id = %user.account_id, item_id = %item.id, "Created library item");

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ItemResponse>>> {
    let items: Vec<ItemResponse> = sqlx::query_as(
        r#"
        SELECT id, description, unit_price_cents, unit, created_at
        FROM items
        WHERE account_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.account_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(items))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1 AND account_id = $2")
        .bind(item_id)
        .bind(user.account_id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

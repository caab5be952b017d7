//! Client record routes
//!
//! Creating a client is quota-bounded (lifetime cap), so the handler
//! consults the gate before inserting.

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
pub struct CreateClientRequest {
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ClientResponse {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn create_client(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<ClientResponse>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Client name is required".to_string()));
    }

    match state
        .gate
        .check(user.account_id, GateAction::CreateClient)
        .await?
    {
        Decision::Allowed => {}
        Decision::Denied { message } => return Err(ApiError::LimitExceeded(message)),
    }

    let client: ClientResponse = sqlx::query_as(
        r#"
        INSERT INTO clients (account_id, name, email, company)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, email, company, created_at
        "#,
    )
    .bind(user.account_id)
    .bind(name)
    .bind(&req.email)
    .bind(&req.company)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(account_id = %user.account_id, client_id = %client.id, "Created client");

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn list_clients(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ClientResponse>>> {
    let clients: Vec<ClientResponse> = sqlx::query_as(
        r#"
        SELECT id, name, email, company, created_at
        FROM clients
        WHERE account_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.account_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(clients))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let rows_affected = sqlx::query("DELETE FROM clients WHERE id = $1 AND account_id = $2")
        .bind(client_id)
        .bind(user.account_id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(ApiError::NotFound("Client not found".to_string()));
    }

    tracing::info!(account_id = %user.account_id, client_id = %client_id, "Deleted client");

    Ok(StatusCode::NO_CONTENT)
}

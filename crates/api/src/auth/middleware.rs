//! Authentication middleware for Axum

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::jwt::JwtManager;

/// Authenticated account information extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub email: Option<String>,
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
}

/// Extract bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(String::from)
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": message })),
    )
        .into_response()
}

/// Middleware that requires a valid bearer token
///
/// Inserts an [`AuthUser`] extension for downstream handlers. Public
/// routes (inquiry form, brief approval, webhook, health) are simply not
/// wrapped with this layer.
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(&request) else {
        return unauthorized("Missing authorization header");
    };

    match auth_state.jwt_manager.verify(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser {
                account_id: claims.sub,
                email: claims.email,
            });
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token verification failed");
            unauthorized("Invalid or expired token")
        }
    }
}

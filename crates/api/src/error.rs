//! API error types and HTTP translation
//!
//! The entitlement gate returns denial as a value; this module owns the
//! transport concern of turning it into a 402 response. Internal failure
//! detail is logged server-side and never leaked to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use sheet2bill_billing::BillingError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A quota check denied the operation. Expected business outcome,
    /// surfaced as 402 with the decision message so the client can
    /// render an upgrade prompt.
    #[error("{0}")]
    LimitExceeded(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<BillingError> for ApiError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::AccountNotFound(id) => ApiError::NotFound(format!("account {id} not found")),
            BillingError::WebhookSignatureInvalid => ApiError::Unauthorized,
            BillingError::WebhookPayloadInvalid(msg) => ApiError::Validation(msg),
            BillingError::InvalidSubscriptionStatus { .. } | BillingError::InvalidPlanTable(_) => {
                ApiError::Internal(e.to_string())
            }
            BillingError::Database(msg) => ApiError::Database(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Database(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::LimitExceeded(message) => {
                // Not a fault; the gate already logged it at info
                (StatusCode::PAYMENT_REQUIRED, message.clone())
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message.clone()),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
            ApiError::Database(detail) | ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_exceeded_maps_to_402_with_message() {
        let message = "You've reached your monthly limit of 10 briefs. Upgrade to create more.";
        let response = ApiError::LimitExceeded(message.to_string()).into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn database_detail_is_not_leaked() {
        let response =
            ApiError::Database("connection refused at 10.0.0.3:5432".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn billing_account_not_found_maps_to_404() {
        let err: ApiError = BillingError::AccountNotFound(uuid::Uuid::nil()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn billing_signature_failure_maps_to_unauthorized() {
        let err: ApiError = BillingError::WebhookSignatureInvalid.into();
        assert!(matches!(err, ApiError::Unauthorized));
    }
}

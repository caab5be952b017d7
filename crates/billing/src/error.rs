//! Billing error types

use thiserror::Error;
use uuid::Uuid;

/// Errors from entitlement and payment operations
#[derive(Debug, Error)]
pub enum BillingError {
    /// The account needed for tier resolution does not exist.
    /// Fatal to the whole gate check: the gate never defaults to a tier.
    #[error("account {0} not found")]
    AccountNotFound(Uuid),

    /// The stored subscription status holds a value outside the known set
    #[error("account {account_id} has invalid subscription status '{value}'")]
    InvalidSubscriptionStatus { account_id: Uuid, value: String },

    /// A plan table failed validation at construction
    #[error("invalid plan table: {0}")]
    InvalidPlanTable(String),

    /// Webhook signature could not be verified
    #[error("webhook signature invalid")]
    WebhookSignatureInvalid,

    /// Webhook payload could not be parsed
    #[error("malformed webhook payload: {0}")]
    WebhookPayloadInvalid(String),

    /// Underlying store failure. Propagated, never interpreted as
    /// "zero usage": a failed count must deny, not allow.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for BillingError {
    fn from(e: sqlx::Error) -> Self {
        BillingError::Database(e.to_string())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

//! Application state

use sqlx::PgPool;
use std::sync::Arc;

use sheet2bill_billing::{EntitlementGate, PaymentService, PlanTable};

use crate::{
    auth::{AuthState, JwtManager},
    config::Config,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt_manager: JwtManager,
    /// The entitlement gate every quota-bounded mutation consults
    pub gate: Arc<EntitlementGate>,
    /// Payment webhook verification and subscription extension
    pub payments: Arc<PaymentService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours);

        // One immutable plan table for the life of the process
        let plans = PlanTable::default_table();
        let gate = Arc::new(EntitlementGate::new(pool.clone(), plans));
        tracing::info!("Entitlement gate initialized");

        let payments = Arc::new(PaymentService::new(
            pool.clone(),
            config.payment_webhook_secret.clone(),
        ));
        tracing::info!("Payment webhook service initialized");

        Self {
            pool,
            config,
            jwt_manager,
            gate,
            payments,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}

//! Route modules and router assembly

pub mod billing;
pub mod briefs;
pub mod clients;
pub mod inquiries;
pub mod items;

use axum::{
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use crate::{auth::require_auth, state::AppState};

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Build the application router.
///
/// Public routes: health, the inquiry form, the client-facing brief
/// approval links, and the payment webhook. Everything else requires a
/// bearer token.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/clients",
            post(clients::create_client).get(clients::list_clients),
        )
        .route("/api/clients/{id}", delete(clients::delete_client))
        .route(
            "/api/briefs",
            post(briefs::create_brief).get(briefs::list_briefs),
        )
        .route("/api/briefs/{id}/send", post(briefs::send_brief))
        .route("/api/briefs/{id}/invoice", post(briefs::convert_to_invoice))
        .route(
            "/api/items",
            post(items::create_item).get(items::list_items),
        )
        .route("/api/items/{id}", delete(items::delete_item))
        .route("/api/inquiries", get(inquiries::list_inquiries))
        .route(
            "/api/billing/subscription",
            get(billing::subscription_status),
        )
        .route("/api/billing/invariants", get(billing::run_invariants))
        .layer(middleware::from_fn_with_state(
            state.auth_state(),
            require_auth,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/inquiries/{handle}", post(inquiries::submit_inquiry))
        .route("/api/briefs/approve/{token}", post(briefs::approve_brief))
        .route("/api/briefs/decline/{token}", post(briefs::decline_brief))
        .route("/api/billing/webhook", post(billing::payment_webhook));

    Router::new().merge(public).merge(protected).with_state(state)
}

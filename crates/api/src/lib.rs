// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Sheet2Bill API Library
//!
//! This crate contains the API server components for Sheet2Bill:
//! configuration, authentication, error translation, and the resource
//! handlers that consult the entitlement gate before every
//! quota-bounded write.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Sheet2Bill Shared Library
//!
//! Cross-crate building blocks:
//!
//! - **Database**: pool construction and the migration runner
//! - **Tier vocabulary**: plan tiers and stored subscription statuses,
//!   shared between the API and billing crates

pub mod db;
pub mod tier;

pub use db::{create_migration_pool, create_pool, run_migrations};
pub use tier::{PlanTier, SubscriptionStatus};

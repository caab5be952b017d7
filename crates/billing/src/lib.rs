// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Sheet2Bill Billing Module
//!
//! Plan limits, tier resolution, and the entitlement gate, plus the
//! payment-webhook flow that extends subscriptions.
//!
//! ## Features
//!
//! - **Plan Table**: immutable tier → limits/features configuration,
//!   validated at construction and injected into the gate
//! - **Tier Resolution**: status + end-date resolution with lazy,
//!   idempotent downgrade of expired trials
//! - **Quota Counters**: lifetime and calendar-month usage counts,
//!   recomputed on every evaluation
//! - **Entitlement Gate**: the allow/deny check every quota-bounded
//!   mutation performs before writing
//! - **Payments**: webhook signature verification and subscription
//!   stacking on confirmed payments
//! - **Invariants**: runnable consistency checks over account state

pub mod error;
pub mod gate;
pub mod invariants;
pub mod payments;
pub mod plan;
pub mod tier;
pub mod usage;

#[cfg(test)]
mod edge_case_tests;

// Error
pub use error::{BillingError, BillingResult};

// Gate
pub use gate::{evaluate, Decision, EntitlementGate, GateAction};

// Invariants
pub use invariants::{
    InvariantCheckSummary, InvariantChecker, InvariantViolation, ViolationSeverity,
};

// Payments
pub use payments::{
    stack_subscription, PaymentEvent, PaymentOutcome, PaymentService, SUBSCRIPTION_PERIOD_DAYS,
};

// Plan
pub use plan::{PlanDefinition, PlanFeatures, PlanLimits, PlanTable, QuotaLimit, ResourceKind};

// Tier
pub use tier::{ResolvedTier, TierResolver};

// Usage
pub use usage::{month_window_start, UsageCounter, UsageSummary};

//! Plan tiers and stored subscription statuses
//!
//! `SubscriptionStatus` is what the `accounts` table stores; `PlanTier`
//! is the effective tier the entitlement gate evaluates against. The two
//! are distinct on purpose: a stored `trialing` or `pro` status only
//! resolves to the `Pro` tier while the subscription end date is in the
//! future.

use serde::{Deserialize, Serialize};

/// Effective plan tier for quota purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
        }
    }

    /// Numeric rank for ordering comparisons (higher = more features)
    pub fn rank(&self) -> u8 {
        match self {
            PlanTier::Free => 0,
            PlanTier::Pro => 1,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored subscription status on the account row.
/// Stored as TEXT; fetched as a string and parsed, so an out-of-range
/// value surfaces as an explicit error instead of a decode panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Free,
    Trialing,
    Pro,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Pro => "pro",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionStatus::Free),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "pro" => Ok(SubscriptionStatus::Pro),
            other => Err(format!("unknown subscription status '{other}'")),
        }
    }
}

//! The entitlement gate
//!
//! Single entry point every quota-bounded mutation calls before writing.
//! Evaluation order: resolve the effective tier (which may persist a lazy
//! trial downgrade), count current usage, apply the decision policy.
//! All three steps complete, or the whole check fails; there is no
//! partial-allow state.
//!
//! Denial is a value, not an error: the gate returns
//! [`Decision::Denied`] and the HTTP layer translates it into a 402.
//! Only infrastructure failures surface as `Err`.
//!
//! The counter read and the caller's subsequent insert are intentionally
//! not transactional. Two concurrent requests for the same account and
//! kind can both pass and jointly exceed the cap by one; the caps are
//! soft usage limits, not safety properties, and the one-request race
//! window is accepted.

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use sheet2bill_shared::PlanTier;

use crate::error::BillingResult;
use crate::plan::{PlanTable, QuotaLimit, ResourceKind};
use crate::tier::TierResolver;
use crate::usage::UsageCounter;

/// A quota-bounded action a caller wants to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    /// Account owner saves a new client record
    CreateClient,
    /// Account owner drafts a new brief
    CreateBrief,
    /// Account owner saves a new library item
    CreateItem,
    /// An unauthenticated third party submits an inquiry to the account
    ReceiveInquiry,
}

impl GateAction {
    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            GateAction::CreateClient => ResourceKind::Clients,
            GateAction::CreateBrief => ResourceKind::Briefs,
            GateAction::CreateItem => ResourceKind::Items,
            GateAction::ReceiveInquiry => ResourceKind::Inquiries,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GateAction::CreateClient => "create_client",
            GateAction::CreateBrief => "create_brief",
            GateAction::CreateItem => "create_item",
            GateAction::ReceiveInquiry => "receive_inquiry",
        }
    }
}

impl std::fmt::Display for GateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied { message: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Pure decision policy: compare the count against the tier's limit.
///
/// Unbounded limits always allow. Denial messages are audience-specific:
/// owner-facing messages name the numeric limit and suggest upgrading,
/// while the inquiry denial is shown to an unauthenticated third party
/// and carries no plan or billing vocabulary.
pub fn evaluate(tier: PlanTier, kind: ResourceKind, count: i64, plans: &PlanTable) -> Decision {
    let limit = plans.limit(tier, kind);
    if limit.permits(count) {
        return Decision::Allowed;
    }

    let message = match (kind, limit) {
        (ResourceKind::Inquiries, _) => {
            "This freelancer can't accept new requests right now. Please try again later."
                .to_string()
        }
        (ResourceKind::Clients, QuotaLimit::Capped(cap)) => format!(
            "You've reached the limit of {cap} clients on your current plan. Upgrade to add more."
        ),
        (ResourceKind::Briefs, QuotaLimit::Capped(cap)) => format!(
            "You've reached your monthly limit of {cap} briefs. Upgrade to create more."
        ),
        (ResourceKind::Items, QuotaLimit::Capped(cap)) => format!(
            "You've reached the limit of {cap} saved items on your current plan. Upgrade to add more."
        ),
        // Unlimited never denies; unreachable but total
        (kind, QuotaLimit::Unlimited) => format!("The {kind} limit has been reached."),
    };

    Decision::Denied { message }
}

/// The gate orchestrator
pub struct EntitlementGate {
    resolver: TierResolver,
    usage: UsageCounter,
    plans: PlanTable,
}

impl EntitlementGate {
    pub fn new(pool: PgPool, plans: PlanTable) -> Self {
        Self {
            resolver: TierResolver::new(pool.clone()),
            usage: UsageCounter::new(pool),
            plans,
        }
    }

    pub fn plans(&self) -> &PlanTable {
        &self.plans
    }

    pub fn usage(&self) -> &UsageCounter {
        &self.usage
    }

    pub fn resolver(&self) -> &TierResolver {
        &self.resolver
    }

    /// Check whether `account_id` may perform `action` right now.
    ///
    /// One `now` is captured up front and feeds both the expiry
    /// comparison and the month window, so the two can't disagree at a
    /// boundary.
    pub async fn check(&self, account_id: Uuid, action: GateAction) -> BillingResult<Decision> {
        let now = OffsetDateTime::now_utc();
        let kind = action.resource_kind();

        let resolved = self.resolver.resolve(account_id, now).await?;
        let count = self.usage.count(account_id, kind, now).await?;
        let decision = evaluate(resolved.tier, kind, count, &self.plans);

        match &decision {
            Decision::Allowed => {
                tracing::debug!(
                    account_id = %account_id,
                    action = %action,
                    tier = %resolved.tier,
                    count = count,
                    "Gate check passed"
                );
            }
            Decision::Denied { .. } => {
                // Expected business outcome, not a fault
                tracing::info!(
                    account_id = %account_id,
                    action = %action,
                    tier = %resolved.tier,
                    count = count,
                    "Gate check denied"
                );
            }
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanDefinition, PlanFeatures, PlanLimits};

    fn table_with_free_briefs(cap: i64) -> PlanTable {
        let free = PlanDefinition {
            limits: PlanLimits {
                clients: QuotaLimit::Capped(5),
                briefs_per_month: QuotaLimit::Capped(cap),
                items: QuotaLimit::Capped(5),
                inquiries_per_month: QuotaLimit::Capped(5),
            },
            features: PlanFeatures {
                custom_branding: false,
                custom_invoice_numbers: false,
            },
        };
        let pro = PlanDefinition {
            limits: PlanLimits {
                clients: QuotaLimit::Unlimited,
                briefs_per_month: QuotaLimit::Capped(200),
                items: QuotaLimit::Capped(500),
                inquiries_per_month: QuotaLimit::Capped(200),
            },
            features: PlanFeatures {
                custom_branding: true,
                custom_invoice_numbers: true,
            },
        };
        PlanTable::new(free, pro).unwrap()
    }

    #[test]
    fn unbounded_limit_always_allows() {
        let table = PlanTable::default_table();
        for count in [0, 1, 1_000, i64::MAX] {
            let decision = evaluate(PlanTier::Pro, ResourceKind::Clients, count, &table);
            assert!(decision.is_allowed(), "count={count}");
        }
    }

    #[test]
    fn finite_limit_allows_iff_below() {
        let table = table_with_free_briefs(3);
        for count in 0..3 {
            assert!(evaluate(PlanTier::Free, ResourceKind::Briefs, count, &table).is_allowed());
        }
        for count in 3..6 {
            assert!(!evaluate(PlanTier::Free, ResourceKind::Briefs, count, &table).is_allowed());
        }
    }

    #[test]
    fn denial_is_monotonic_in_count() {
        let table = PlanTable::default_table();
        let mut denied_at: Option<i64> = None;
        for count in 0..20 {
            let allowed =
                evaluate(PlanTier::Free, ResourceKind::Clients, count, &table).is_allowed();
            if let Some(first) = denied_at {
                assert!(!allowed, "denied at {first} must stay denied at {count}");
            } else if !allowed {
                denied_at = Some(count);
            }
        }
        assert!(denied_at.is_some());
    }

    #[test]
    fn free_brief_cap_three_denies_third_brief_and_names_limit() {
        let table = table_with_free_briefs(3);
        match evaluate(PlanTier::Free, ResourceKind::Briefs, 3, &table) {
            Decision::Denied { message } => {
                assert!(message.contains('3'), "message should name the limit: {message}");
                assert!(message.to_lowercase().contains("upgrade"));
            }
            Decision::Allowed => panic!("expected denial at the cap"),
        }
    }

    #[test]
    fn free_brief_cap_ten_allows_three_existing() {
        let table = table_with_free_briefs(10);
        assert!(evaluate(PlanTier::Free, ResourceKind::Briefs, 3, &table).is_allowed());
    }

    #[test]
    fn pro_inquiry_denial_is_public_safe() {
        let table = PlanTable::default_table();
        match evaluate(PlanTier::Pro, ResourceKind::Inquiries, 1_000, &table) {
            Decision::Denied { message } => {
                let lower = message.to_lowercase();
                for word in ["plan", "upgrade", "billing", "pro", "limit", "200"] {
                    assert!(!lower.contains(word), "public message leaks '{word}': {message}");
                }
            }
            Decision::Allowed => panic!("pro inquiries are capped at 200"),
        }
    }

    #[test]
    fn free_inquiry_denial_matches_pro_denial() {
        // The public message depends on the kind, never on the tier
        let table = PlanTable::default_table();
        let free = evaluate(PlanTier::Free, ResourceKind::Inquiries, 5, &table);
        let pro = evaluate(PlanTier::Pro, ResourceKind::Inquiries, 200, &table);
        assert_eq!(free, pro);
    }

    #[test]
    fn owner_denials_name_the_limit() {
        let table = PlanTable::default_table();
        for (kind, count, expected) in [
            (ResourceKind::Clients, 5, "5"),
            (ResourceKind::Items, 5, "5"),
            (ResourceKind::Briefs, 10, "10"),
        ] {
            match evaluate(PlanTier::Free, kind, count, &table) {
                Decision::Denied { message } => {
                    assert!(message.contains(expected), "{kind}: {message}")
                }
                Decision::Allowed => panic!("{kind} should deny at its cap"),
            }
        }
    }

    #[test]
    fn actions_map_to_kinds() {
        assert_eq!(GateAction::CreateClient.resource_kind(), ResourceKind::Clients);
        assert_eq!(GateAction::CreateBrief.resource_kind(), ResourceKind::Briefs);
        assert_eq!(GateAction::CreateItem.resource_kind(), ResourceKind::Items);
        assert_eq!(
            GateAction::ReceiveInquiry.resource_kind(),
            ResourceKind::Inquiries
        );
    }
}

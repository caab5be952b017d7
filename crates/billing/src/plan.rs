//! Plan configuration
//!
//! The plan table is an immutable configuration value constructed once at
//! startup and injected into the gate, so tests can substitute synthetic
//! tables. Limits are either a whole-number cap or `Unlimited`; for every
//! resource kind the free cap must not exceed the pro cap.

use serde::Serialize;

use sheet2bill_shared::PlanTier;

use crate::error::{BillingError, BillingResult};

/// The quota-bounded resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Clients,
    Briefs,
    Items,
    Inquiries,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Clients => "clients",
            ResourceKind::Briefs => "briefs",
            ResourceKind::Items => "items",
            ResourceKind::Inquiries => "inquiries",
        }
    }

    /// Whether this kind is counted over the current calendar month.
    /// `clients` and `items` are lifetime caps; `briefs` and `inquiries`
    /// reset each month.
    pub fn is_monthly(&self) -> bool {
        matches!(self, ResourceKind::Briefs | ResourceKind::Inquiries)
    }

    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Clients,
        ResourceKind::Briefs,
        ResourceKind::Items,
        ResourceKind::Inquiries,
    ];
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A per-kind quota limit
///
/// Serializes as the bare cap, or `null` for unlimited, so API responses
/// can render usage meters without a wrapper object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QuotaLimit {
    /// Whole-number cap; an operation is allowed while `count < cap`
    Capped(i64),
    /// No cap; always allows regardless of count
    Unlimited,
}

impl QuotaLimit {
    /// Allow rule: strictly-less-than the cap, so a count equal to the
    /// cap is already denied
    pub fn permits(&self, count: i64) -> bool {
        match self {
            QuotaLimit::Unlimited => true,
            QuotaLimit::Capped(cap) => count < *cap,
        }
    }

    pub fn cap(&self) -> Option<i64> {
        match self {
            QuotaLimit::Unlimited => None,
            QuotaLimit::Capped(cap) => Some(*cap),
        }
    }

    /// Ordering used by table validation: `Unlimited` dominates any cap
    fn at_most(&self, other: &QuotaLimit) -> bool {
        match (self, other) {
            (_, QuotaLimit::Unlimited) => true,
            (QuotaLimit::Unlimited, QuotaLimit::Capped(_)) => false,
            (QuotaLimit::Capped(a), QuotaLimit::Capped(b)) => a <= b,
        }
    }
}

/// Per-tier numeric limits
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanLimits {
    pub clients: QuotaLimit,
    pub briefs_per_month: QuotaLimit,
    pub items: QuotaLimit,
    pub inquiries_per_month: QuotaLimit,
}

impl PlanLimits {
    pub fn limit_for(&self, kind: ResourceKind) -> QuotaLimit {
        match kind {
            ResourceKind::Clients => self.clients,
            ResourceKind::Briefs => self.briefs_per_month,
            ResourceKind::Items => self.items,
            ResourceKind::Inquiries => self.inquiries_per_month,
        }
    }
}

/// Per-tier feature flags
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanFeatures {
    /// Hide the Sheet2Bill watermark on exported documents
    pub custom_branding: bool,
    /// Allow custom invoice numbering schemes
    pub custom_invoice_numbers: bool,
}

/// One tier's limits and feature flags
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanDefinition {
    pub limits: PlanLimits,
    pub features: PlanFeatures,
}

/// Static tier → definition mapping, loaded once at process start
#[derive(Debug, Clone)]
pub struct PlanTable {
    free: PlanDefinition,
    pro: PlanDefinition,
}

impl PlanTable {
    /// Build a validated table. Fails if any free limit exceeds the
    /// corresponding pro limit.
    pub fn new(free: PlanDefinition, pro: PlanDefinition) -> BillingResult<Self> {
        for kind in ResourceKind::ALL {
            let free_limit = free.limits.limit_for(kind);
            let pro_limit = pro.limits.limit_for(kind);
            if !free_limit.at_most(&pro_limit) {
                return Err(BillingError::InvalidPlanTable(format!(
                    "free limit for {kind} ({free_limit:?}) exceeds pro limit ({pro_limit:?})"
                )));
            }
        }
        Ok(Self { free, pro })
    }

    /// The canonical production table.
    ///
    /// Free: 5 clients, 10 briefs/month, 5 items, 5 inquiries/month.
    /// Pro: unlimited clients, with safety caps of 200 briefs/month,
    /// 500 items, and 200 inquiries/month.
    pub fn default_table() -> Self {
        Self {
            free: PlanDefinition {
                limits: PlanLimits {
                    clients: QuotaLimit::Capped(5),
                    briefs_per_month: QuotaLimit::Capped(10),
                    items: QuotaLimit::Capped(5),
                    inquiries_per_month: QuotaLimit::Capped(5),
                },
                features: PlanFeatures {
                    custom_branding: false,
                    custom_invoice_numbers: false,
                },
            },
            pro: PlanDefinition {
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
            },
        }
    }

    pub fn definition(&self, tier: PlanTier) -> &PlanDefinition {
        match tier {
            PlanTier::Free => &self.free,
            PlanTier::Pro => &self.pro,
        }
    }

    pub fn limit(&self, tier: PlanTier, kind: ResourceKind) -> QuotaLimit {
        self.definition(tier).limits.limit_for(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(clients: i64, briefs: i64, items: i64, inquiries: i64) -> PlanDefinition {
        PlanDefinition {
            limits: PlanLimits {
                clients: QuotaLimit::Capped(clients),
                briefs_per_month: QuotaLimit::Capped(briefs),
                items: QuotaLimit::Capped(items),
                inquiries_per_month: QuotaLimit::Capped(inquiries),
            },
            features: PlanFeatures {
                custom_branding: false,
                custom_invoice_numbers: false,
            },
        }
    }

    #[test]
    fn default_table_orders_tiers() {
        let table = PlanTable::default_table();
        for kind in ResourceKind::ALL {
            let free = table.limit(PlanTier::Free, kind);
            let pro = table.limit(PlanTier::Pro, kind);
            assert!(
                free.at_most(&pro),
                "free limit for {kind} must not exceed pro"
            );
        }
    }

    #[test]
    fn default_table_passes_validation() {
        let table = PlanTable::default_table();
        assert!(PlanTable::new(*table.definition(PlanTier::Free), *table.definition(PlanTier::Pro)).is_ok());
    }

    #[test]
    fn free_above_pro_is_rejected() {
        let err = PlanTable::new(limits(10, 10, 10, 10), limits(5, 200, 500, 200));
        assert!(matches!(err, Err(BillingError::InvalidPlanTable(_))));
    }

    #[test]
    fn unlimited_free_with_capped_pro_is_rejected() {
        let mut free = limits(5, 10, 5, 5);
        free.limits.clients = QuotaLimit::Unlimited;
        let err = PlanTable::new(free, limits(100, 200, 500, 200));
        assert!(matches!(err, Err(BillingError::InvalidPlanTable(_))));
    }

    #[test]
    fn capped_permits_strictly_below_cap() {
        let limit = QuotaLimit::Capped(3);
        assert!(limit.permits(0));
        assert!(limit.permits(2));
        assert!(!limit.permits(3));
        assert!(!limit.permits(4));
    }

    #[test]
    fn unlimited_permits_any_count() {
        assert!(QuotaLimit::Unlimited.permits(0));
        assert!(QuotaLimit::Unlimited.permits(i64::MAX));
    }

    #[test]
    fn monthly_kinds() {
        assert!(ResourceKind::Briefs.is_monthly());
        assert!(ResourceKind::Inquiries.is_monthly());
        assert!(!ResourceKind::Clients.is_monthly());
        assert!(!ResourceKind::Items.is_monthly());
    }
}

// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge Case Tests for the Entitlement System
//!
//! Tests critical boundary conditions in:
//! - Decision policy (GATE-D01 to GATE-D06)
//! - Month windowing (GATE-W01 to GATE-W04)
//! - Subscription stacking (PAY-S01 to PAY-S04)

#[cfg(test)]
mod decision_tests {
    use crate::gate::{evaluate, Decision};
    use crate::plan::*;
    use sheet2bill_shared::PlanTier;

    fn table(free_cap: i64, pro_cap: i64) -> PlanTable {
        let def = |cap: i64, flags: bool| PlanDefinition {
            limits: PlanLimits {
                clients: QuotaLimit::Capped(cap),
                briefs_per_month: QuotaLimit::Capped(cap),
                items: QuotaLimit::Capped(cap),
                inquiries_per_month: QuotaLimit::Capped(cap),
            },
            features: PlanFeatures {
                custom_branding: flags,
                custom_invoice_numbers: flags,
            },
        };
        PlanTable::new(def(free_cap, false), def(pro_cap, true)).unwrap()
    }

    // =========================================================================
    // GATE-D01: Count exactly at the cap - denied (rule is strict less-than)
    // =========================================================================
    #[test]
    fn test_count_at_cap_is_denied() {
        let table = table(5, 200);
        for kind in ResourceKind::ALL {
            assert!(
                !evaluate(PlanTier::Free, kind, 5, &table).is_allowed(),
                "{kind} at cap should deny"
            );
        }
    }

    // =========================================================================
    // GATE-D02: Count one below the cap - allowed
    // =========================================================================
    #[test]
    fn test_count_below_cap_is_allowed() {
        let table = table(5, 200);
        for kind in ResourceKind::ALL {
            assert!(
                evaluate(PlanTier::Free, kind, 4, &table).is_allowed(),
                "{kind} below cap should allow"
            );
        }
    }

    // =========================================================================
    // GATE-D03: Zero cap - denied at zero usage
    // =========================================================================
    #[test]
    fn test_zero_cap_denies_first_use() {
        let table = table(0, 200);
        assert!(!evaluate(PlanTier::Free, ResourceKind::Clients, 0, &table).is_allowed());
    }

    // =========================================================================
    // GATE-D04: Count far past the cap - still denied (no wraparound)
    // =========================================================================
    #[test]
    fn test_count_far_past_cap_stays_denied() {
        let table = table(5, 200);
        assert!(!evaluate(PlanTier::Free, ResourceKind::Briefs, i64::MAX, &table).is_allowed());
    }

    // =========================================================================
    // GATE-D05: Same count, higher tier - allowed (tier ordering)
    // =========================================================================
    #[test]
    fn test_pro_allows_where_free_denies() {
        let table = table(5, 200);
        assert!(!evaluate(PlanTier::Free, ResourceKind::Items, 10, &table).is_allowed());
        assert!(evaluate(PlanTier::Pro, ResourceKind::Items, 10, &table).is_allowed());
    }

    // =========================================================================
    // GATE-D06: Owner denial carries the cap; public denial carries nothing
    // =========================================================================
    #[test]
    fn test_message_audience_split() {
        let table = table(5, 200);

        match evaluate(PlanTier::Free, ResourceKind::Clients, 5, &table) {
            Decision::Denied { message } => assert!(message.contains('5')),
            Decision::Allowed => panic!("expected denial"),
        }

        match evaluate(PlanTier::Free, ResourceKind::Inquiries, 5, &table) {
            Decision::Denied { message } => {
                assert!(!message.contains('5'));
                assert!(!message.to_lowercase().contains("plan"));
            }
            Decision::Allowed => panic!("expected denial"),
        }
    }
}

#[cfg(test)]
mod window_tests {
    use crate::usage::month_window_start;
    use time::macros::datetime;

    // =========================================================================
    // GATE-W01: First instant of a month maps to itself
    // =========================================================================
    #[test]
    fn test_window_start_fixed_point() {
        let start = datetime!(2025-03-01 00:00:00 UTC);
        assert_eq!(month_window_start(start), start);
    }

    // =========================================================================
    // GATE-W02: Last instant of a month maps to that month's start
    // =========================================================================
    #[test]
    fn test_window_start_from_month_end() {
        let end = datetime!(2025-03-31 23:59:59.999999 UTC);
        assert_eq!(month_window_start(end), datetime!(2025-03-01 00:00:00 UTC));
    }

    // =========================================================================
    // GATE-W03: Leap-day February resolves to Feb 1
    // =========================================================================
    #[test]
    fn test_window_start_leap_february() {
        let leap = datetime!(2024-02-29 12:00:00 UTC);
        assert_eq!(month_window_start(leap), datetime!(2024-02-01 00:00:00 UTC));
    }

    // =========================================================================
    // GATE-W04: Year boundary - Jan 1 instant starts a fresh window
    // =========================================================================
    #[test]
    fn test_window_start_year_boundary() {
        let new_year = datetime!(2026-01-01 00:00:00 UTC);
        assert_eq!(month_window_start(new_year), new_year);

        let old_year = datetime!(2025-12-31 23:59:59 UTC);
        assert_eq!(
            month_window_start(old_year),
            datetime!(2025-12-01 00:00:00 UTC)
        );
    }
}

#[cfg(test)]
mod stacking_tests {
    use crate::payments::{stack_subscription, SUBSCRIPTION_PERIOD_DAYS};
    use time::macros::datetime;
    use time::Duration;

    // =========================================================================
    // PAY-S01: End date exactly at now counts as expired - restart from now
    // =========================================================================
    #[test]
    fn test_end_date_equal_to_now_restarts() {
        let now = datetime!(2025-06-10 12:00:00 UTC);
        assert_eq!(
            stack_subscription(Some(now), now),
            now + Duration::days(SUBSCRIPTION_PERIOD_DAYS)
        );
    }

    // =========================================================================
    // PAY-S02: End date one second in the future - stacks on top of it
    // =========================================================================
    #[test]
    fn test_end_date_barely_active_stacks() {
        let now = datetime!(2025-06-10 12:00:00 UTC);
        let current = now + Duration::seconds(1);
        assert_eq!(
            stack_subscription(Some(current), now),
            current + Duration::days(SUBSCRIPTION_PERIOD_DAYS)
        );
    }

    // =========================================================================
    // PAY-S03: Two consecutive payments buy two full periods
    // =========================================================================
    #[test]
    fn test_double_payment_stacks_two_periods() {
        let now = datetime!(2025-06-10 12:00:00 UTC);
        let after_first = stack_subscription(None, now);
        let after_second = stack_subscription(Some(after_first), now);
        assert_eq!(
            after_second,
            now + Duration::days(2 * SUBSCRIPTION_PERIOD_DAYS)
        );
    }

    // =========================================================================
    // PAY-S04: Stacking never shortens the subscription
    // =========================================================================
    #[test]
    fn test_stacking_is_monotonic() {
        let now = datetime!(2025-06-10 12:00:00 UTC);
        for current in [
            None,
            Some(datetime!(2020-01-01 00:00:00 UTC)),
            Some(now),
            Some(datetime!(2025-12-01 00:00:00 UTC)),
        ] {
            let stacked = stack_subscription(current, now);
            assert!(stacked > now);
            if let Some(current) = current {
                assert!(stacked > current);
            }
        }
    }
}

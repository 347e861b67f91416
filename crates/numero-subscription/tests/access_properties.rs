//! Access and usage properties of the subscription model

use numero_storage::{get_json, keys, KeyValueStore, MemoryStore};
use numero_subscription::{
    required_tier, tier_for_plan, Gate, GateDecision, SubscribedUser, SubscriptionService, Tier,
    UsageLimits, FEATURE_TIERS,
};
use proptest::prelude::*;
use std::sync::Arc;

struct Profile {
    plan: Option<String>,
    premium: bool,
}

impl SubscribedUser for Profile {
    fn subscription_plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    fn is_premium(&self) -> bool {
        self.premium
    }
}

fn any_tier() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Free), Just(Tier::Premium), Just(Tier::Enterprise)]
}

fn any_feature() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(FEATURE_TIERS.iter().map(|(n, _)| (*n).to_string()).collect::<Vec<_>>()),
        "[a-zA-Z-]{1,16}",
    ]
}

proptest! {
    #[test]
    fn prop_has_access_matches_rank(tier in any_tier(), feature in any_feature()) {
        let svc = SubscriptionService::new(Arc::new(MemoryStore::new()));
        svc.set_tier(tier);

        let expected = tier.rank() >= required_tier(&feature).rank();
        prop_assert_eq!(svc.has_access(&feature), expected);
    }

    #[test]
    fn prop_unknown_plan_is_free(plan in "[a-z]{0,12}") {
        prop_assume!(!matches!(plan.as_str(), "free" | "basic" | "premium" | "elite"));
        prop_assert_eq!(tier_for_plan(Some(&plan), false), Tier::Free);
        if plan != "enterprise" {
            prop_assert_eq!(Tier::parse_lenient(&plan), Tier::Free);
        }
    }

    #[test]
    fn prop_no_access_means_no_use(tier in any_tier(), feature in any_feature(), uses in 0usize..5) {
        let svc = SubscriptionService::new(Arc::new(MemoryStore::new()));
        svc.set_tier(tier);
        for _ in 0..uses {
            svc.increment_usage(&feature);
        }

        if !svc.has_access(&feature) {
            prop_assert!(!svc.can_use_feature(&feature));
        }
    }

    #[test]
    fn prop_increment_is_monotonic_and_persisted(feature in any_feature(), n in 1u64..20) {
        let store = Arc::new(MemoryStore::new());
        let svc = SubscriptionService::new(store.clone());
        let before = svc.usage_of(&feature).map_or(0, |u| u.used);

        for _ in 0..n {
            svc.increment_usage(&feature);
            let persisted: UsageLimits =
                get_json(store.as_ref() as &dyn KeyValueStore, keys::SUBSCRIPTION_USAGE).unwrap();
            prop_assert_eq!(&persisted, &svc.usage());
        }

        prop_assert_eq!(svc.usage_of(&feature).unwrap().used, before + n);
    }

    #[test]
    fn prop_gate_agrees_with_rank(current in any_tier(), required in any_tier(), preview in any::<bool>()) {
        let decision = Gate::new(required).locked_preview(preview).evaluate(current);
        prop_assert_eq!(decision.is_open(), current.rank() >= required.rank());
        if !decision.is_open() {
            let expected = if preview {
                GateDecision::LockedPreview { required }
            } else {
                GateDecision::Hidden
            };
            prop_assert_eq!(decision, expected);
        }
    }
}

#[test]
fn elite_user_gets_auspicious_dates() {
    let svc = SubscriptionService::new(Arc::new(MemoryStore::new()));
    svc.sync_user(Some(&Profile {
        plan: Some("elite".to_string()),
        premium: true,
    }));

    assert_eq!(svc.tier(), Tier::Enterprise);
    assert_eq!(required_tier("auspicious-dates"), Tier::Premium);
    assert!(svc.has_access("auspicious-dates"));
}

#[test]
fn anonymous_user_exhausts_monthly_report() {
    let svc = SubscriptionService::new(Arc::new(MemoryStore::new()));
    svc.sync_user::<Profile>(None);

    assert_eq!(svc.tier(), Tier::Free);
    assert_eq!(svc.usage_of("monthlyReports").unwrap().limit, 1);
    assert!(svc.can_use_feature("monthlyReports"));

    svc.increment_usage("monthlyReports");
    assert!(!svc.can_use_feature("monthlyReports"));
}

#[test]
fn counts_survive_logout_and_login() {
    let store = Arc::new(MemoryStore::new());
    let svc = SubscriptionService::new(store.clone());
    svc.sync_user(Some(&Profile {
        plan: Some("basic".to_string()),
        premium: false,
    }));
    svc.increment_usage("nameAnalyses");
    svc.increment_usage("nameAnalyses");

    svc.sync_user::<Profile>(None);
    assert_eq!(svc.usage_of("nameAnalyses").unwrap().used, 2);
    assert!(!svc.can_use_feature("nameAnalyses"));

    let fresh = SubscriptionService::new(store);
    fresh.sync_user(Some(&Profile {
        plan: Some("premium".to_string()),
        premium: true,
    }));
    assert_eq!(fresh.usage_of("nameAnalyses").unwrap().used, 2);
    assert!(fresh.can_use_feature("nameAnalyses"));
}

//! Subscription service
//!
//! Owns the current tier and usage counters. Two writers exist:
//! - [`SubscriptionService::sync_user`]: authoritative, runs on every user change
//! - [`SubscriptionService::set_tier`]: local override for selection flows
//!
//! The override does not survive the next user change: `sync_user` always
//! recomputes the tier from the user's plan.

use crate::features::required_tier;
use crate::tier::{tier_for_plan, Tier};
use crate::usage::{UsageLimit, UsageLimits};
use numero_storage::{get_json, keys, set_json, KeyValueStore};
use parking_lot::RwLock;
use std::sync::Arc;

/// What the service needs to know about a user
pub trait SubscribedUser {
    /// Backend plan identifier, if any
    fn subscription_plan(&self) -> Option<&str>;

    /// Backend premium flag
    fn is_premium(&self) -> bool;
}

#[derive(Debug, Clone)]
struct State {
    tier: Tier,
    usage: UsageLimits,
}

/// Tier and usage state with persistence
#[derive(Debug)]
pub struct SubscriptionService {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<State>,
}

impl SubscriptionService {
    /// Create service, restoring any persisted tier and counters
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let tier = store
            .get(keys::SUBSCRIPTION_TIER)
            .map_or(Tier::Free, |raw| Tier::parse_lenient(&raw));

        let mut usage = UsageLimits::for_tier(tier);
        if let Some(persisted) = get_json::<UsageLimits>(store.as_ref(), keys::SUBSCRIPTION_USAGE) {
            usage.overlay_used(&persisted);
        }

        Self {
            store,
            state: RwLock::new(State { tier, usage }),
        }
    }

    /// Current tier
    #[inline]
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.state.read().tier
    }

    /// Copy of the usage counters
    #[must_use]
    pub fn usage(&self) -> UsageLimits {
        self.state.read().usage.clone()
    }

    /// Counter for one feature
    #[must_use]
    pub fn usage_of(&self, feature: &str) -> Option<UsageLimit> {
        self.state.read().usage.get(feature).copied()
    }

    /// Override the tier locally
    ///
    /// Reseeds usage from the static table and persists the tier. No
    /// backend call is made.
    pub fn set_tier(&self, tier: Tier) {
        {
            let mut state = self.state.write();
            state.tier = tier;
            state.usage = UsageLimits::for_tier(tier);
        }
        self.store.set(keys::SUBSCRIPTION_TIER, tier.as_str().to_string());
        tracing::info!(%tier, "Subscription tier overridden");
    }

    /// Recompute from the authenticated user (`None` = anonymous)
    ///
    /// Reseeds usage for the derived tier, then restores persisted `used`
    /// counts so they survive the reseed.
    pub fn sync_user<U: SubscribedUser + ?Sized>(&self, user: Option<&U>) {
        let tier = user.map_or(Tier::Free, |u| {
            tier_for_plan(u.subscription_plan(), u.is_premium())
        });

        let mut usage = UsageLimits::for_tier(tier);
        if let Some(persisted) =
            get_json::<UsageLimits>(self.store.as_ref(), keys::SUBSCRIPTION_USAGE)
        {
            usage.overlay_used(&persisted);
        }

        let previous = {
            let mut state = self.state.write();
            let previous = state.tier;
            *state = State { tier, usage };
            previous
        };

        if previous == tier {
            tracing::debug!(%tier, "Subscription recomputed");
        } else {
            tracing::info!(from = %previous, to = %tier, "Subscription tier changed");
        }
    }

    /// Whether the current tier opens `feature`
    #[must_use]
    pub fn has_access(&self, feature: &str) -> bool {
        self.tier().has_access(required_tier(feature))
    }

    /// Whether `feature` may be used right now
    ///
    /// Requires access; then passes if the feature has no counter, is
    /// unlimited, or is under its cap.
    #[must_use]
    pub fn can_use_feature(&self, feature: &str) -> bool {
        let state = self.state.read();
        if !state.tier.has_access(required_tier(feature)) {
            return false;
        }
        state
            .usage
            .get(feature)
            .map_or(true, UsageLimit::has_remaining)
    }

    /// Record one use of `feature` and persist the full map
    pub fn increment_usage(&self, feature: &str) -> UsageLimit {
        let (entry, snapshot) = {
            let mut state = self.state.write();
            let entry = state.usage.increment(feature);
            (entry, state.usage.clone())
        };

        set_json(self.store.as_ref(), keys::SUBSCRIPTION_USAGE, &snapshot);
        tracing::debug!(feature, used = entry.used, limit = entry.limit, "Usage recorded");
        entry
    }

    /// Tier to offer when `feature` is locked, `None` if already open
    #[must_use]
    pub fn upgrade_prompt(&self, feature: &str) -> Option<Tier> {
        let required = required_tier(feature);
        (!self.tier().has_access(required)).then_some(required)
    }
}

//! Per-feature usage counters

use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Limit value meaning "no cap"
pub const UNLIMITED: i64 = -1;

/// Usage of one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimit {
    /// Times used
    pub used: u64,
    /// Cap (`-1` = unlimited)
    pub limit: i64,
}

impl UsageLimit {
    /// Fresh counter with a cap
    #[inline]
    #[must_use]
    pub fn new(limit: i64) -> Self {
        Self { used: 0, limit }
    }

    /// Whether the cap is disabled
    #[inline]
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.limit == UNLIMITED
    }

    /// Whether another use fits under the cap
    #[inline]
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.is_unlimited() || i64::try_from(self.used).map_or(false, |used| used < self.limit)
    }

    /// Uses left, `None` when unlimited
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        if self.is_unlimited() {
            return None;
        }
        let limit = u64::try_from(self.limit).unwrap_or(0);
        Some(limit.saturating_sub(self.used))
    }
}

/// Usage counters keyed by feature name
///
/// Serialises as the `subscription_usage` JSON object:
/// `{"monthlyReports": {"used": 0, "limit": 1}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageLimits(BTreeMap<String, UsageLimit>);

/// Static per-tier caps
const TIER_LIMITS: [(Tier, [(&str, i64); 5]); 3] = [
    (
        Tier::Free,
        [
            ("monthlyReports", 1),
            ("aiChatMessages", 5),
            ("nameAnalyses", 1),
            ("phoneAnalyses", 1),
            ("consultations", 0),
        ],
    ),
    (
        Tier::Premium,
        [
            ("monthlyReports", 10),
            ("aiChatMessages", 100),
            ("nameAnalyses", 10),
            ("phoneAnalyses", 10),
            ("consultations", 2),
        ],
    ),
    (
        Tier::Enterprise,
        [
            ("monthlyReports", UNLIMITED),
            ("aiChatMessages", UNLIMITED),
            ("nameAnalyses", UNLIMITED),
            ("phoneAnalyses", UNLIMITED),
            ("consultations", UNLIMITED),
        ],
    ),
];

impl UsageLimits {
    /// Empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh counters seeded from the static table
    #[must_use]
    pub fn for_tier(tier: Tier) -> Self {
        let caps = TIER_LIMITS
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, caps)| caps.as_slice())
            .unwrap_or_default();

        Self(
            caps.iter()
                .map(|(feature, limit)| ((*feature).to_string(), UsageLimit::new(*limit)))
                .collect(),
        )
    }

    /// Counter for a feature
    #[inline]
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<&UsageLimit> {
        self.0.get(feature)
    }

    /// Record one use, creating a `{used: 1, limit: 1}` entry if absent
    pub fn increment(&mut self, feature: &str) -> UsageLimit {
        let entry = self
            .0
            .entry(feature.to_string())
            .and_modify(|e| e.used += 1)
            .or_insert(UsageLimit { used: 1, limit: 1 });
        *entry
    }

    /// Carry `used` counts over from a persisted map
    ///
    /// Seeded limits win for features both maps know; features only the
    /// persisted map knows are kept as stored.
    pub fn overlay_used(&mut self, persisted: &UsageLimits) {
        for (feature, stored) in &persisted.0 {
            self.0
                .entry(feature.clone())
                .and_modify(|e| e.used = stored.used)
                .or_insert(*stored);
        }
    }

    /// Iterate counters in feature order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UsageLimit)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of tracked features
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

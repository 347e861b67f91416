//! Feature → required tier table

use crate::tier::Tier;

/// Features that need more than the free tier, plus the free ones we list
/// explicitly. Anything missing from this table is free.
pub const FEATURE_TIERS: &[(&str, Tier)] = &[
    ("daily-reading", Tier::Free),
    ("birth-chart", Tier::Free),
    ("life-path", Tier::Free),
    ("basic-numerology", Tier::Free),
    ("monthly-reports", Tier::Free),
    ("auspicious-dates", Tier::Premium),
    ("name-numerology", Tier::Premium),
    ("phone-numerology", Tier::Premium),
    ("weekly-report", Tier::Premium),
    ("yearly-report", Tier::Premium),
    ("ai-chat", Tier::Premium),
    ("consultations", Tier::Premium),
    ("raj-yog", Tier::Premium),
    ("compatibility", Tier::Premium),
    ("pdf-export", Tier::Premium),
    ("api-access", Tier::Enterprise),
    ("bulk-reports", Tier::Enterprise),
    ("team-management", Tier::Enterprise),
    ("white-label", Tier::Enterprise),
];

/// Tier a feature requires (`Free` if unlisted)
#[must_use]
pub fn required_tier(feature: &str) -> Tier {
    FEATURE_TIERS
        .iter()
        .find(|(name, _)| *name == feature)
        .map_or(Tier::Free, |(_, tier)| *tier)
}

/// Listed features available at `tier`
#[must_use]
pub fn features_for(tier: Tier) -> Vec<&'static str> {
    FEATURE_TIERS
        .iter()
        .filter(|(_, required)| tier.has_access(*required))
        .map(|(name, _)| *name)
        .collect()
}

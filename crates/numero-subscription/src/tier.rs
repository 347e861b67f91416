//! Tiers and plans
//!
//! The backend speaks in plans (`free|basic|premium|elite`); everything on
//! the client speaks in tiers (`free|premium|enterprise`). Unknown input on
//! either side never fails: it lands on [`Tier::Free`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Local subscription tier
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No paid plan
    #[default]
    Free,
    /// Paid individual plan
    Premium,
    /// Highest plan
    Enterprise,
}

impl Tier {
    /// All tiers, lowest first
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Premium, Tier::Enterprise];

    /// Numeric rank used for access checks
    #[inline]
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Tier::Free => 0,
            Tier::Premium => 1,
            Tier::Enterprise => 2,
        }
    }

    /// Whether this tier satisfies `required`
    #[inline]
    #[must_use]
    pub fn has_access(self, required: Tier) -> bool {
        self.rank() >= required.rank()
    }

    /// Parse a tier name; unrecognised input is `Free`
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "premium" => Tier::Premium,
            "enterprise" => Tier::Enterprise,
            _ => Tier::Free,
        }
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free plan
    Free,
    /// Entry paid plan
    Basic,
    /// Standard paid plan
    Premium,
    /// Top plan
    Elite,
}

impl Plan {
    /// Parse a plan identifier (case-insensitive)
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Plan::Free),
            "basic" => Some(Plan::Basic),
            "premium" => Some(Plan::Premium),
            "elite" => Some(Plan::Elite),
            _ => None,
        }
    }

    /// Tier this plan unlocks
    #[inline]
    #[must_use]
    pub fn tier(self) -> Tier {
        match self {
            Plan::Free => Tier::Free,
            Plan::Basic | Plan::Premium => Tier::Premium,
            Plan::Elite => Tier::Enterprise,
        }
    }
}

/// Map a user's plan onto a tier
///
/// Known plans map through [`Plan::tier`]. A missing or unknown plan is
/// `Free`, unless the backend flagged the user as premium.
#[must_use]
pub fn tier_for_plan(plan: Option<&str>, is_premium: bool) -> Tier {
    match plan.and_then(Plan::parse) {
        Some(plan) => plan.tier(),
        None if is_premium => Tier::Premium,
        None => Tier::Free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_ordered() {
        assert_eq!(Tier::Free.rank(), 0);
        assert_eq!(Tier::Premium.rank(), 1);
        assert_eq!(Tier::Enterprise.rank(), 2);
        assert!(Tier::Enterprise > Tier::Premium);
    }

    #[test]
    fn access_check() {
        assert!(Tier::Enterprise.has_access(Tier::Premium));
        assert!(Tier::Premium.has_access(Tier::Premium));
        assert!(!Tier::Free.has_access(Tier::Premium));
    }

    #[test]
    fn lenient_parse() {
        assert_eq!(Tier::parse_lenient(" Premium "), Tier::Premium);
        assert_eq!(Tier::parse_lenient("enterprise"), Tier::Enterprise);
        assert_eq!(Tier::parse_lenient("gold"), Tier::Free);
        assert_eq!(Tier::parse_lenient(""), Tier::Free);
    }

    #[test]
    fn plan_mapping() {
        assert_eq!(tier_for_plan(Some("free"), false), Tier::Free);
        assert_eq!(tier_for_plan(Some("basic"), false), Tier::Premium);
        assert_eq!(tier_for_plan(Some("premium"), false), Tier::Premium);
        assert_eq!(tier_for_plan(Some("elite"), false), Tier::Enterprise);
        assert_eq!(tier_for_plan(Some("ELITE"), false), Tier::Enterprise);
    }

    #[test]
    fn plan_mapping_defaults() {
        assert_eq!(tier_for_plan(None, false), Tier::Free);
        assert_eq!(tier_for_plan(Some("platinum"), false), Tier::Free);
        assert_eq!(tier_for_plan(None, true), Tier::Premium);
        // An explicit plan wins over the flag
        assert_eq!(tier_for_plan(Some("free"), true), Tier::Free);
    }

    #[test]
    fn tier_serde_names() {
        assert_eq!(serde_json::to_string(&Tier::Enterprise).unwrap(), "\"enterprise\"");
        let plan: Plan = serde_json::from_str("\"elite\"").unwrap();
        assert_eq!(plan, Plan::Elite);
    }
}

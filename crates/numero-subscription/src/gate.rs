//! Subscription gate
//!
//! Pure decision for a render boundary: show the feature, hide it, or show
//! a dimmed preview with an upgrade prompt.

use crate::tier::Tier;

/// Outcome of a gate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Caller's tier is high enough
    Render,
    /// Withhold the feature entirely
    Hidden,
    /// Dimmed children plus an upgrade prompt for `required`
    LockedPreview {
        /// Tier the prompt should offer
        required: Tier,
    },
}

impl GateDecision {
    /// Whether the real feature is shown
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Render)
    }
}

/// Conditional boundary for a required tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    required: Tier,
    locked_preview: bool,
}

impl Gate {
    /// Gate requiring `required`
    #[inline]
    #[must_use]
    pub fn new(required: Tier) -> Self {
        Self {
            required,
            locked_preview: false,
        }
    }

    /// Show a locked preview instead of nothing
    #[inline]
    #[must_use]
    pub fn locked_preview(mut self, enabled: bool) -> Self {
        self.locked_preview = enabled;
        self
    }

    /// Required tier
    #[inline]
    #[must_use]
    pub fn required(&self) -> Tier {
        self.required
    }

    /// Decide for the caller's tier
    #[must_use]
    pub fn evaluate(&self, current: Tier) -> GateDecision {
        if current.has_access(self.required) {
            GateDecision::Render
        } else if self.locked_preview {
            GateDecision::LockedPreview {
                required: self.required,
            }
        } else {
            GateDecision::Hidden
        }
    }

    /// Decide for a raw tier string; unrecognised strings rank as free
    #[must_use]
    pub fn evaluate_str(&self, current: &str) -> GateDecision {
        self.evaluate(Tier::parse_lenient(current))
    }
}

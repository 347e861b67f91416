//! Numero Subscription
//!
//! Client-side subscription model: maps the backend's plan onto a local
//! [`Tier`], decides which features a tier may open, and tracks per-feature
//! usage against static per-tier limits.
//!
//! # Core Concepts
//!
//! - [`Tier`]: `free < premium < enterprise`, total order
//! - [`Plan`]: backend plan identifier, mapped by [`tier_for_plan`]
//! - [`Gate`]: conditional render boundary for a required tier
//! - [`UsageLimits`]: `{used, limit}` counters, `-1` meaning unlimited
//! - [`SubscriptionService`]: tier + usage state with persistence
//!
//! # Example
//!
//! ```rust,ignore
//! use numero_subscription::{SubscriptionService, Tier};
//! use numero_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let subscription = SubscriptionService::new(Arc::new(MemoryStore::new()));
//! assert_eq!(subscription.tier(), Tier::Free);
//! assert!(!subscription.has_access("auspicious-dates"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod features;
mod gate;
mod service;
mod tier;
mod usage;

pub use features::{features_for, required_tier, FEATURE_TIERS};
pub use gate::{Gate, GateDecision};
pub use service::{SubscribedUser, SubscriptionService};
pub use tier::{tier_for_plan, Plan, Tier};
pub use usage::{UsageLimit, UsageLimits, UNLIMITED};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

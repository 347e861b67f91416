//! Request generations for discarding superseded responses

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request counter
///
/// Each submission takes a new generation. When its response arrives, it is
/// applied only if no newer submission began in the meantime.
#[derive(Debug, Default)]
pub struct RequestGeneration(AtomicU64);

impl RequestGeneration {
    /// Create at generation zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding all earlier ones
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Whether `generation` is still the latest
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::Acquire) == generation
    }

    /// Supersede outstanding requests without starting a new one
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

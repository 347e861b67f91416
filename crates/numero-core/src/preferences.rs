//! Onboarding flag and locale

use numero_storage::{get_flag, keys, KeyValueStore};
use std::sync::Arc;

/// Locale used when none is stored
pub const DEFAULT_LOCALE: &str = "en";

/// Persisted UI preferences
#[derive(Debug, Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    /// Create over a store
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Whether onboarding has been finished
    #[must_use]
    pub fn onboarding_complete(&self) -> bool {
        get_flag(self.store.as_ref(), keys::ONBOARDING_COMPLETE)
    }

    /// Mark onboarding finished (or reset it)
    pub fn set_onboarding_complete(&self, complete: bool) {
        self.store
            .set(keys::ONBOARDING_COMPLETE, complete.to_string());
    }

    /// Preferred locale, `en` by default
    #[must_use]
    pub fn locale(&self) -> String {
        self.store
            .get(keys::LOCALE)
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
    }

    /// Store the preferred locale
    pub fn set_locale(&self, locale: &str) {
        let locale = locale.trim();
        if locale.is_empty() {
            self.store.remove(keys::LOCALE);
        } else {
            self.store.set(keys::LOCALE, locale.to_string());
        }
        tracing::debug!(locale, "Locale updated");
    }
}

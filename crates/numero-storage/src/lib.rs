//! Numero Storage
//!
//! Best-effort key-value persistence for client state that survives between
//! sessions: tokens, the cached user profile, subscription tier and usage
//! counters, onboarding and locale preferences.
//!
//! # Core Concepts
//!
//! - [`KeyValueStore`]: injected `get`/`set`/`remove` seam
//! - [`MemoryStore`]: ephemeral store for tests and throwaway sessions
//! - [`FileStore`]: single JSON document on disk
//! - [`keys`]: the exact key names shared with deployed clients
//!
//! Every operation is best effort. A store that cannot be read behaves as
//! if the key were absent, which callers treat as "logged out" or "defaults".

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod file;
mod memory;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Persisted key names
pub mod keys {
    /// Bearer token for API calls
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Token exchanged on logout
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Cached user profile (JSON)
    pub const USER: &str = "user";
    /// Locally selected subscription tier
    pub const SUBSCRIPTION_TIER: &str = "subscription_tier";
    /// Usage counters (JSON object of `{used, limit}`)
    pub const SUBSCRIPTION_USAGE: &str = "subscription_usage";
    /// `"true"` once onboarding finished
    pub const ONBOARDING_COMPLETE: &str = "onboarding_complete";
    /// Preferred locale tag
    pub const LOCALE: &str = "locale";

    /// Every key owned by the client
    pub const ALL: [&str; 7] = [
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        USER,
        SUBSCRIPTION_TIER,
        SUBSCRIPTION_USAGE,
        ONBOARDING_COMPLETE,
        LOCALE,
    ];
}

/// Injected key-value persistence
///
/// Implementations must never panic; failures are logged and swallowed.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read a raw value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a raw value
    fn set(&self, key: &str, value: String);

    /// Delete a value (no-op if absent)
    fn remove(&self, key: &str);
}

/// Read and decode a JSON value; corrupt data is treated as absent
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring corrupt stored value");
            None
        }
    }
}

/// Encode and write a JSON value
pub fn set_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, raw),
        Err(e) => tracing::warn!(key, error = %e, "Failed to encode value for storage"),
    }
}

/// Read a `"true"`/`"false"` flag; anything else is `false`
#[must_use]
pub fn get_flag(store: &dyn KeyValueStore, key: &str) -> bool {
    store.get(key).is_some_and(|v| v == "true")
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

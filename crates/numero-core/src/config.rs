//! Configuration
//!
//! Sources, lowest to highest precedence:
//! 1. [`Config::default`]
//! 2. a TOML file
//! 3. environment variables ([`ENV_API_URL`], [`ENV_STRIPE_KEY`], [`ENV_STORAGE_PATH`])

use crate::error::ConfigError;
use crate::polling::PollingPolicy;
use numero_api::ApiConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Backend base URL
pub const ENV_API_URL: &str = "NEXT_PUBLIC_API_URL";
/// Stripe publishable key
pub const ENV_STRIPE_KEY: &str = "NEXT_PUBLIC_STRIPE_PUBLISHABLE_KEY";
/// State file path
pub const ENV_STORAGE_PATH: &str = "NUMERO_STORAGE_PATH";

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Per-site polling policies
///
/// Each `[polling.<site>]` table overlays that site's own defaults, so
/// overriding one field keeps the site's ceiling and quiet statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PollingOverrides")]
pub struct PollingConfig {
    /// Phone report job
    pub phone_report: PollingPolicy,
    /// Name report job
    pub name_report: PollingPolicy,
    /// Open conversation
    pub conversation_messages: PollingPolicy,
    /// Unread badge
    pub unread_notifications: PollingPolicy,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            phone_report: PollingPolicy::phone_report(),
            name_report: PollingPolicy::name_report(),
            conversation_messages: PollingPolicy::conversation_messages(),
            unread_notifications: PollingPolicy::unread_notifications(),
        }
    }
}

/// Fields a config file may set on one poll site
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyOverride {
    interval_ms: Option<u64>,
    max_consecutive_failures: Option<u32>,
    quiet_statuses: Option<Vec<u16>>,
    poll_immediately: Option<bool>,
}

impl PolicyOverride {
    fn apply(self, mut policy: PollingPolicy) -> PollingPolicy {
        if let Some(ms) = self.interval_ms {
            policy.interval = Duration::from_millis(ms);
        }
        if let Some(max) = self.max_consecutive_failures {
            policy.max_consecutive_failures = Some(max);
        }
        if let Some(statuses) = self.quiet_statuses {
            policy.quiet_statuses = statuses;
        }
        if let Some(immediately) = self.poll_immediately {
            policy.poll_immediately = immediately;
        }
        policy
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PollingOverrides {
    phone_report: PolicyOverride,
    name_report: PolicyOverride,
    conversation_messages: PolicyOverride,
    unread_notifications: PolicyOverride,
}

impl From<PollingOverrides> for PollingConfig {
    fn from(o: PollingOverrides) -> Self {
        Self {
            phone_report: o.phone_report.apply(PollingPolicy::phone_report()),
            name_report: o.name_report.apply(PollingPolicy::name_report()),
            conversation_messages: o
                .conversation_messages
                .apply(PollingPolicy::conversation_messages()),
            unread_notifications: o
                .unread_notifications
                .apply(PollingPolicy::unread_notifications()),
        }
    }
}

impl PollingConfig {
    fn all(&self) -> [(&'static str, &PollingPolicy); 4] {
        [
            ("phone_report", &self.phone_report),
            ("name_report", &self.name_report),
            ("conversation_messages", &self.conversation_messages),
            ("unread_notifications", &self.unread_notifications),
        ]
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub api_url: String,
    /// Stripe publishable key, handed to the card form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_publishable_key: Option<String>,
    /// State file; `None` keeps state in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
    /// Per-request timeout in seconds; `None` waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Polling policies
    pub polling: PollingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            stripe_publishable_key: None,
            storage_path: None,
            request_timeout_secs: None,
            polling: PollingConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then `path` if given, then the process environment
    ///
    /// # Errors
    /// - `ConfigError::Io` / `ConfigError::Parse` if the file cannot be used
    /// - `ConfigError::Invalid` if the merged values are unusable
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides from `lookup`
    ///
    /// Empty values are ignored.
    #[must_use]
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(key) = get(ENV_STRIPE_KEY) {
            self.stripe_publishable_key = Some(key);
        }
        if let Some(path) = get(ENV_STORAGE_PATH) {
            self.storage_path = Some(PathBuf::from(path));
        }
        self
    }

    /// With backend URL
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// With state file
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Check values that would only fail later
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        for (name, policy) in self.polling.all() {
            if policy.interval.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "polling.{name}.interval_ms must be positive"
                )));
            }
        }
        Ok(())
    }

    /// Settings for the HTTP client
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        let config = ApiConfig::new(self.api_url.trim());
        match self.request_timeout_secs {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.api_config().base_url, DEFAULT_API_URL);
        assert_eq!(config.api_config().timeout, None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            api_url = "https://api.example.com/api"
            request_timeout_secs = 20

            [polling.phone_report]
            interval_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "https://api.example.com/api");
        assert_eq!(
            config.polling.phone_report.interval,
            Duration::from_secs(5)
        );
        assert_eq!(config.polling.name_report, PollingPolicy::name_report());
        assert_eq!(
            config.api_config().timeout,
            Some(Duration::from_secs(20))
        );
    }

    #[test]
    fn partial_unread_override_keeps_site_rules() {
        let config: Config = toml::from_str(
            r#"
            [polling.unread_notifications]
            interval_ms = 30000
            "#,
        )
        .unwrap();

        let mut expected = PollingPolicy::unread_notifications();
        expected.interval = Duration::from_secs(30);
        assert_eq!(config.polling.unread_notifications, expected);
        assert_eq!(expected.max_consecutive_failures, Some(3));
        assert_eq!(
            config.polling.conversation_messages,
            PollingPolicy::conversation_messages()
        );
    }

    #[test]
    fn printed_config_reads_back() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }

    #[test]
    fn env_overrides_file() {
        let config = Config::default()
            .with_api_url("https://file.example.com")
            .with_env(env(&[
                (ENV_API_URL, "https://env.example.com/api"),
                (ENV_STRIPE_KEY, "pk_test_123"),
                (ENV_STORAGE_PATH, ""),
            ]));

        assert_eq!(config.api_url, "https://env.example.com/api");
        assert_eq!(config.stripe_publishable_key.as_deref(), Some("pk_test_123"));
        assert_eq!(config.storage_path, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::default().with_api_url("ftp://x").validate(),
            Err(ConfigError::Invalid(_))
        ));

        let mut config = Config::default();
        config.polling.unread_notifications.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numero.toml");
        std::fs::write(&path, "storage_path = \"/tmp/numero.json\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/numero.json")));

        std::fs::write(&path, "api_url = [").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Config::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}

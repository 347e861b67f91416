//! Polling policy objects
//!
//! Every poll site has its own interval and failure rule. Keeping them as
//! values (rather than constants buried in loops) makes the differences
//! visible and configurable:
//!
//! | site | interval | first poll | ceiling | quiet statuses |
//! |---|---|---|---|---|
//! | phone report | 2 s | after one interval | none | - |
//! | name report | 3 s | after one interval | none | - |
//! | conversation messages | 3 s | immediate | none | - |
//! | unread notifications | 60 s | immediate | 3 | 429, 500 |

use numero_api::{ApiError, NumerologyReport};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interval and failure rule of one poll site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingPolicy {
    /// Time between polls
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,
    /// Stop after this many failures in a row; `None` polls forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consecutive_failures: Option<u32>,
    /// Statuses that count as failures but are only logged at debug
    #[serde(default)]
    pub quiet_statuses: Vec<u16>,
    /// Poll once right away instead of waiting one interval
    #[serde(default)]
    pub poll_immediately: bool,
}

impl PollingPolicy {
    /// Unbounded policy with the given interval
    #[must_use]
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_consecutive_failures: None,
            quiet_statuses: Vec::new(),
            poll_immediately: false,
        }
    }

    /// Phone report job: every 2 s until ready
    #[must_use]
    pub fn phone_report() -> Self {
        Self::every(Duration::from_secs(2))
    }

    /// Name report job: every 3 s until ready
    #[must_use]
    pub fn name_report() -> Self {
        Self::every(Duration::from_secs(3))
    }

    /// Open conversation: load now, then every 3 s while watched
    #[must_use]
    pub fn conversation_messages() -> Self {
        Self::every(Duration::from_secs(3)).with_poll_immediately(true)
    }

    /// Unread badge: every 60 s, gives up after 3 failures in a row
    #[must_use]
    pub fn unread_notifications() -> Self {
        Self::every(Duration::from_secs(60))
            .with_max_consecutive_failures(3)
            .with_quiet_statuses([429, 500])
            .with_poll_immediately(true)
    }

    /// With a failure ceiling
    #[inline]
    #[must_use]
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = Some(max);
        self
    }

    /// With statuses kept out of warn-level logs
    #[must_use]
    pub fn with_quiet_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.quiet_statuses = statuses.into_iter().collect();
        self
    }

    /// With an immediate first poll
    #[inline]
    #[must_use]
    pub fn with_poll_immediately(mut self, immediately: bool) -> Self {
        self.poll_immediately = immediately;
        self
    }

    /// Whether `failures` in a row reach the ceiling
    #[inline]
    #[must_use]
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_consecutive_failures
            .is_some_and(|max| failures >= max)
    }

    /// Whether an error should stay out of warn-level logs
    #[must_use]
    pub fn is_quiet(&self, error: &ApiError) -> bool {
        error
            .status()
            .is_some_and(|status| self.quiet_statuses.contains(&status))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Decides when a polled value is final
pub trait ReadinessPredicate<T>: Send + Sync {
    /// Whether polling can stop on `value`
    fn is_ready(&self, value: &T) -> bool;
}

impl<T, F> ReadinessPredicate<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn is_ready(&self, value: &T) -> bool {
        self(value)
    }
}

/// Report is ready once `computed_at` is set
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputedAt;

impl ReadinessPredicate<NumerologyReport> for ComputedAt {
    fn is_ready(&self, report: &NumerologyReport) -> bool {
        report.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_differ_per_site() {
        assert_eq!(PollingPolicy::phone_report().interval, Duration::from_secs(2));
        assert_eq!(PollingPolicy::name_report().interval, Duration::from_secs(3));
        assert_eq!(
            PollingPolicy::conversation_messages().interval,
            Duration::from_secs(3)
        );
        assert_eq!(
            PollingPolicy::unread_notifications().interval,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn only_unread_has_a_ceiling() {
        assert!(!PollingPolicy::phone_report().exhausted(1_000));

        let unread = PollingPolicy::unread_notifications();
        assert!(!unread.exhausted(2));
        assert!(unread.exhausted(3));
    }

    #[test]
    fn quiet_statuses() {
        let unread = PollingPolicy::unread_notifications();
        assert!(unread.is_quiet(&ApiError::from_response(429, "")));
        assert!(unread.is_quiet(&ApiError::from_response(500, "")));
        assert!(!unread.is_quiet(&ApiError::from_response(503, "")));
        assert!(!unread.is_quiet(&ApiError::Network("reset".into())));
    }

    #[test]
    fn serde_uses_milliseconds() {
        let policy: PollingPolicy = toml::from_str("interval_ms = 1500").unwrap();
        assert_eq!(policy, PollingPolicy::every(Duration::from_millis(1500)));
    }

    #[test]
    fn readiness() {
        let pending: NumerologyReport = serde_json::from_str(r#"{"computed_at": null}"#).unwrap();
        let ready: NumerologyReport =
            serde_json::from_str(r#"{"computed_at": "2024-05-01T10:00:00Z"}"#).unwrap();

        assert!(!ComputedAt.is_ready(&pending));
        assert!(ComputedAt.is_ready(&ready));

        let positive = |n: &i32| *n > 0;
        assert!(positive.is_ready(&3));
    }
}

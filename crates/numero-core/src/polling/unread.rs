//! Unread notification count
//!
//! Background badge poller with a failure ceiling. After the configured
//! number of consecutive failures it stops for good; a fresh poller must be
//! spawned to resume. Nothing here is user-visible: failures are logged,
//! quiet statuses only at debug.

use crate::polling::policy::PollingPolicy;
use numero_api::NotificationBackend;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Badge state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadState {
    /// Last successfully fetched count
    pub count: u64,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Ceiling reached; no further fetches
    pub stopped: bool,
}

/// Running unread-count poll loop
#[derive(Debug)]
pub struct UnreadCountPoller {
    state: watch::Receiver<UnreadState>,
    task: JoinHandle<()>,
}

impl UnreadCountPoller {
    /// Start polling with the default policy (60 s, 3 failures)
    #[must_use]
    pub fn spawn(backend: Arc<dyn NotificationBackend>) -> Self {
        Self::spawn_with(backend, PollingPolicy::unread_notifications())
    }

    /// Start polling with a custom policy
    #[must_use]
    pub fn spawn_with(backend: Arc<dyn NotificationBackend>, policy: PollingPolicy) -> Self {
        let (tx, rx) = watch::channel(UnreadState::default());
        let task = tokio::spawn(unread_task(backend, policy, tx));
        Self { state: rx, task }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> UnreadState {
        *self.state.borrow()
    }

    /// Last fetched count
    #[must_use]
    pub fn count(&self) -> u64 {
        self.state.borrow().count
    }

    /// Whether the ceiling was reached
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.borrow().stopped
    }

    /// Watch state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UnreadState> {
        self.state.clone()
    }
}

impl Drop for UnreadCountPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn unread_task(
    backend: Arc<dyn NotificationBackend>,
    policy: PollingPolicy,
    state: watch::Sender<UnreadState>,
) {
    let start = if policy.poll_immediately {
        Instant::now()
    } else {
        Instant::now() + policy.interval
    };
    let mut ticker = time::interval_at(start, policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match backend.unread_count().await {
            Ok(count) => {
                tracing::debug!(count, "Unread count fetched");
                state.send_modify(|s| {
                    s.count = count;
                    s.consecutive_failures = 0;
                });
            }
            Err(e) => {
                let mut failures = 0;
                state.send_modify(|s| {
                    s.consecutive_failures += 1;
                    failures = s.consecutive_failures;
                });

                if policy.is_quiet(&e) {
                    tracing::debug!(error = %e, failures, "Unread count unavailable");
                } else {
                    tracing::warn!(error = %e, failures, "Unread count poll failed");
                }

                if policy.exhausted(failures) {
                    tracing::info!(failures, "Unread count polling stopped");
                    state.send_modify(|s| s.stopped = true);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use numero_api::ApiError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Plays back scripted results, then keeps returning the last one
    struct Script {
        results: Mutex<VecDeque<Result<u64, u16>>>,
        calls: AtomicU32,
    }

    impl Script {
        fn new(results: impl IntoIterator<Item = Result<u64, u16>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into_iter().collect()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl NotificationBackend for Script {
        async fn unread_count(&self) -> Result<u64, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock();
            let next = if results.len() > 1 {
                results.pop_front()
            } else {
                results.front().copied()
            };
            match next.unwrap_or(Ok(0)) {
                Ok(n) => Ok(n),
                Err(status) => Err(ApiError::from_response(status, "")),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_every_minute() {
        let backend = Script::new([Ok(4)]);
        let poller = UnreadCountPoller::spawn(backend.clone());

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.count(), 4);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_failure_count() {
        let backend = Script::new([Err(500), Err(429), Ok(2), Err(500), Err(500), Ok(3)]);
        let poller = UnreadCountPoller::spawn(backend.clone());

        time::sleep(Duration::from_secs(6 * 60)).await;
        let state = poller.state();
        assert!(!state.stopped);
        assert_eq!(state.count, 3);
        assert_eq!(state.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn non_quiet_failures_also_count() {
        let backend = Script::new([Err(401)]);
        let poller = UnreadCountPoller::spawn(backend.clone());

        time::sleep(Duration::from_secs(10 * 60)).await;
        assert!(poller.is_stopped());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }
}

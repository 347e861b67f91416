//! Report job poller
//!
//! `Idle -> Submitted(job) -> Polling -> Resolved(report)`, back to `Idle`
//! on cancel or a failed submit. A new submission cancels the running loop.
//! Dropping the poller aborts its task, so no fetch happens after drop.

use crate::error::JobError;
use crate::notify::Notifier;
use crate::polling::generation::RequestGeneration;
use crate::polling::policy::{ComputedAt, PollingPolicy, ReadinessPredicate};
use numero_api::{JobId, NumerologyReport, ReportBackend, ReportKind, ReportRequest};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Observable state of a [`JobPoller`]
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    /// Nothing submitted, or cancelled
    Idle,
    /// Backend accepted the job; first poll pending
    Submitted { job_id: JobId },
    /// Polling the latest report
    Polling { job_id: JobId, attempts: u32 },
    /// A ready report was observed
    Resolved {
        job_id: JobId,
        report: NumerologyReport,
    },
}

impl JobState {
    /// Job being tracked, if any
    #[must_use]
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Self::Idle => None,
            Self::Submitted { job_id }
            | Self::Polling { job_id, .. }
            | Self::Resolved { job_id, .. } => Some(job_id),
        }
    }

    /// Resolved report, if any
    #[must_use]
    pub fn report(&self) -> Option<&NumerologyReport> {
        match self {
            Self::Resolved { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Whether no poll loop will change this state
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Idle | Self::Resolved { .. })
    }
}

/// Submits report jobs of one kind and polls them to completion
pub struct JobPoller {
    kind: ReportKind,
    backend: Arc<dyn ReportBackend>,
    notifier: Arc<dyn Notifier>,
    policy: PollingPolicy,
    readiness: Arc<dyn ReadinessPredicate<NumerologyReport>>,
    state: Arc<watch::Sender<JobState>>,
    generation: Arc<RequestGeneration>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobPoller")
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl JobPoller {
    /// Create an idle poller with the default policy for `kind`
    #[must_use]
    pub fn new(
        kind: ReportKind,
        backend: Arc<dyn ReportBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let policy = match kind {
            ReportKind::Phone => PollingPolicy::phone_report(),
            ReportKind::Name => PollingPolicy::name_report(),
        };
        let (state, _) = watch::channel(JobState::Idle);

        Self {
            kind,
            backend,
            notifier,
            policy,
            readiness: Arc::new(ComputedAt),
            state: Arc::new(state),
            generation: Arc::new(RequestGeneration::new()),
            task: Mutex::new(None),
        }
    }

    /// With a different polling policy
    #[must_use]
    pub fn with_policy(mut self, policy: PollingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// With a different readiness check
    #[must_use]
    pub fn with_readiness(
        mut self,
        readiness: impl ReadinessPredicate<NumerologyReport> + 'static,
    ) -> Self {
        self.readiness = Arc::new(readiness);
        self
    }

    /// Report kind this poller handles
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &PollingPolicy {
        &self.policy
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    /// Watch state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    /// Submit a report request and start polling
    ///
    /// Any running loop is cancelled first. A submit error is toasted and
    /// leaves the poller `Idle`. If another submission starts while this one
    /// is in flight, this response is discarded with [`JobError::Superseded`].
    pub async fn submit(&self, request: &ReportRequest) -> Result<JobId, JobError> {
        if request.kind() != self.kind {
            return Err(JobError::KindMismatch {
                expected: self.kind,
                actual: request.kind(),
            });
        }

        let generation = {
            let mut task = self.task.lock();
            if let Some(old) = task.take() {
                old.abort();
            }
            self.generation.begin()
        };
        self.state.send_replace(JobState::Idle);

        let result = self.backend.generate_report(request).await;

        let mut task = self.task.lock();
        if !self.generation.is_current(generation) {
            tracing::debug!(kind = %self.kind, "Discarding superseded submit response");
            return Err(JobError::Superseded);
        }

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                drop(task);
                tracing::warn!(kind = %self.kind, error = %e, "Report submission failed");
                self.notifier.error(&e.user_message());
                return Err(JobError::Submit(e));
            }
        };

        let job_id = handle.job_id;
        tracing::info!(kind = %self.kind, %job_id, "Report job submitted");
        self.state.send_replace(JobState::Submitted {
            job_id: job_id.clone(),
        });

        *task = Some(tokio::spawn(poll_task(
            self.kind,
            job_id.clone(),
            Arc::clone(&self.backend),
            self.policy.clone(),
            Arc::clone(&self.readiness),
            Publisher {
                state: Arc::clone(&self.state),
                generation: Arc::clone(&self.generation),
                mine: generation,
            },
        )));
        Ok(job_id)
    }

    /// Wait until the state settles; returns the report if one resolved
    pub async fn wait_resolved(&self) -> Option<NumerologyReport> {
        let mut rx = self.state.subscribe();
        let settled = rx.wait_for(JobState::is_settled).await.ok()?;
        settled.report().cloned()
    }

    /// Stop polling and return to `Idle`
    pub fn cancel(&self) {
        {
            let mut task = self.task.lock();
            if let Some(old) = task.take() {
                old.abort();
            }
            self.generation.invalidate();
        }
        self.state.send_replace(JobState::Idle);
        tracing::debug!(kind = %self.kind, "Report polling cancelled");
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// State writes of one poll loop, valid only while its generation is current
///
/// `abort` cannot stop a fetch already running on another worker, so a
/// superseded loop may still reach a publish; the check runs under the watch
/// lock, ordered against the `Idle` a newer submit or cancel publishes.
struct Publisher {
    state: Arc<watch::Sender<JobState>>,
    generation: Arc<RequestGeneration>,
    mine: u64,
}

impl Publisher {
    /// Publish `next`; `false` once superseded
    fn publish(&self, next: JobState) -> bool {
        self.state.send_if_modified(|current| {
            if self.generation.is_current(self.mine) {
                *current = next;
                true
            } else {
                false
            }
        })
    }
}

/// Poll loop (runs in its own tokio task)
async fn poll_task(
    kind: ReportKind,
    job_id: JobId,
    backend: Arc<dyn ReportBackend>,
    policy: PollingPolicy,
    readiness: Arc<dyn ReadinessPredicate<NumerologyReport>>,
    state: Publisher,
) {
    let start = if policy.poll_immediately {
        Instant::now()
    } else {
        Instant::now() + policy.interval
    };
    let mut ticker = time::interval_at(start, policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts = 0u32;
    let mut failures = 0u32;

    loop {
        ticker.tick().await;
        attempts += 1;
        if !state.publish(JobState::Polling {
            job_id: job_id.clone(),
            attempts,
        }) {
            tracing::debug!(%kind, %job_id, "Poll loop superseded");
            return;
        }

        match backend.latest_report(kind).await {
            Ok(Some(report)) if readiness.is_ready(&report) => {
                if state.publish(JobState::Resolved {
                    job_id: job_id.clone(),
                    report,
                }) {
                    tracing::info!(%kind, %job_id, attempts, "Report ready");
                } else {
                    tracing::debug!(%kind, %job_id, "Discarding report of superseded job");
                }
                return;
            }
            Ok(_) => {
                failures = 0;
                tracing::debug!(%kind, %job_id, attempts, "Report not ready yet");
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(%kind, %job_id, attempts, error = %e, "Report poll failed");
                if policy.exhausted(failures) {
                    tracing::warn!(%kind, %job_id, failures, "Giving up on report job");
                    state.publish(JobState::Idle);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use async_trait::async_trait;
    use numero_api::{ApiError, JobHandle};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Toasts(Mutex<Vec<String>>);

    impl Notifier for Toasts {
        fn notify(&self, _: Severity, message: &str) {
            self.0.lock().push(message.to_string());
        }
    }

    /// Ready from the `ready_on`-th fetch
    struct Backend {
        ready_on: u32,
        fetches: AtomicU32,
        fail_submit: bool,
    }

    impl Backend {
        fn ready_on(n: u32) -> Arc<Self> {
            Arc::new(Self {
                ready_on: n,
                fetches: AtomicU32::new(0),
                fail_submit: false,
            })
        }
    }

    #[async_trait]
    impl ReportBackend for Backend {
        async fn generate_report(&self, _: &ReportRequest) -> Result<JobHandle, ApiError> {
            if self.fail_submit {
                return Err(ApiError::from_response(402, r#"{"detail": "Upgrade required"}"#));
            }
            Ok(JobHandle {
                job_id: JobId("J".into()),
                status: None,
            })
        }

        async fn latest_report(
            &self,
            _: ReportKind,
        ) -> Result<Option<NumerologyReport>, ApiError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            let body = if n >= self.ready_on {
                format!(r#"{{"id": {n}, "computed_at": "2024-05-01T10:00:00Z"}}"#)
            } else {
                format!(r#"{{"id": {n}, "computed_at": null}}"#)
            };
            Ok(Some(serde_json::from_str(&body)?))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_waits_one_interval() {
        let backend = Backend::ready_on(1);
        let poller = JobPoller::new(ReportKind::Phone, backend.clone(), Arc::new(Toasts::default()));
        poller.submit(&ReportRequest::phone("5551234567")).await.unwrap();

        time::sleep(Duration::from_millis(1_900)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 0);
        assert!(matches!(poller.state(), JobState::Submitted { .. }));

        let report = poller.wait_resolved().await.unwrap();
        assert_eq!(report.id.as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_error_is_toasted_and_stays_idle() {
        let backend = Arc::new(Backend {
            ready_on: 1,
            fetches: AtomicU32::new(0),
            fail_submit: true,
        });
        let toasts = Arc::new(Toasts::default());
        let poller = JobPoller::new(ReportKind::Name, backend.clone(), toasts.clone());

        let err = poller.submit(&ReportRequest::name("Asha")).await.unwrap_err();
        assert!(matches!(err, JobError::Submit(_)));
        assert_eq!(poller.state(), JobState::Idle);
        assert_eq!(toasts.0.lock().as_slice(), ["Upgrade required"]);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejects_other_kind() {
        let poller = JobPoller::new(
            ReportKind::Name,
            Backend::ready_on(1),
            Arc::new(Toasts::default()),
        );
        let err = poller.submit(&ReportRequest::phone("5551234567")).await.unwrap_err();
        assert!(matches!(err, JobError::KindMismatch { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_fetching() {
        let backend = Backend::ready_on(u32::MAX);
        let poller = JobPoller::new(ReportKind::Phone, backend.clone(), Arc::new(Toasts::default()));
        poller.submit(&ReportRequest::phone("5551234567")).await.unwrap();

        time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 2);

        poller.cancel();
        assert_eq!(poller.state(), JobState::Idle);
        time::sleep(Duration::from_secs(20)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_readiness() {
        let backend = Backend::ready_on(u32::MAX);
        let poller = JobPoller::new(ReportKind::Phone, backend.clone(), Arc::new(Toasts::default()))
            .with_policy(PollingPolicy::every(Duration::from_millis(100)))
            .with_readiness(|r: &NumerologyReport| r.id.as_deref() == Some("4"));

        poller.submit(&ReportRequest::phone("5551234567")).await.unwrap();
        let report = poller.wait_resolved().await.unwrap();

        assert_eq!(report.id.as_deref(), Some("4"));
        assert!(!report.is_ready());
    }
    /// Holds each fetch until released
    #[derive(Default)]
    struct Stalled {
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl ReportBackend for Stalled {
        async fn generate_report(&self, _: &ReportRequest) -> Result<JobHandle, ApiError> {
            Ok(JobHandle {
                job_id: JobId("J".into()),
                status: None,
            })
        }

        async fn latest_report(
            &self,
            _: ReportKind,
        ) -> Result<Option<NumerologyReport>, ApiError> {
            self.release.notified().await;
            Ok(Some(serde_json::from_str(
                r#"{"id": 1, "computed_at": "2024-05-01T10:00:00Z"}"#,
            )?))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_loop_cannot_publish_after_new_submit() {
        let backend = Arc::new(Stalled::default());
        let (tx, _) = watch::channel(JobState::Idle);
        let state = Arc::new(tx);
        let generation = Arc::new(RequestGeneration::new());
        let mine = generation.begin();

        let stale = tokio::spawn(poll_task(
            ReportKind::Phone,
            JobId("old".into()),
            backend.clone(),
            PollingPolicy::every(Duration::from_millis(100)),
            Arc::new(ComputedAt),
            Publisher {
                state: Arc::clone(&state),
                generation: Arc::clone(&generation),
                mine,
            },
        ));
        let mut rx = state.subscribe();
        rx.wait_for(|s| matches!(s, JobState::Polling { .. }))
            .await
            .unwrap();

        // A newer submission takes over while the old fetch is in flight
        generation.begin();
        state.send_replace(JobState::Submitted {
            job_id: JobId("new".into()),
        });
        backend.release.notify_one();
        stale.await.unwrap();

        assert_eq!(
            *state.borrow(),
            JobState::Submitted {
                job_id: JobId("new".into())
            }
        );
    }

    #[test]
    fn publisher_stops_once_superseded() {
        let (tx, _) = watch::channel(JobState::Idle);
        let generation = Arc::new(RequestGeneration::new());
        let publisher = Publisher {
            state: Arc::new(tx),
            generation: Arc::clone(&generation),
            mine: generation.begin(),
        };
        let polling = JobState::Polling {
            job_id: JobId("J".into()),
            attempts: 1,
        };

        assert!(publisher.publish(polling.clone()));
        generation.invalidate();
        assert!(!publisher.publish(JobState::Idle));
        assert_eq!(*publisher.state.borrow(), polling);
    }
}

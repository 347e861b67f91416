//! Report job polling against the fake backend

use numero_api::{ApiError, JobId, NumerologyReport, ReportKind, ReportRequest};
use numero_core::{JobError, JobPoller, JobState};
use numero_test_utils::{pending_report, ready_report, FakeBackend, RecordingNotifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

fn phone_poller(backend: &Arc<FakeBackend>) -> (JobPoller, Arc<RecordingNotifier>) {
    let notifier = RecordingNotifier::new();
    let poller = JobPoller::new(ReportKind::Phone, backend.clone(), notifier.clone());
    (poller, notifier)
}

fn phone() -> ReportRequest {
    ReportRequest::phone("+15551234567")
}

#[tokio::test(start_paused = true)]
async fn resolves_on_third_poll_and_stops() {
    let backend = FakeBackend::new();
    backend.latest.set([
        Ok(Some(pending_report(1))),
        Ok(Some(pending_report(2))),
        Ok(Some(ready_report(3))),
    ]);
    let (poller, notifier) = phone_poller(&backend);

    let job_id = poller.submit(&phone()).await.unwrap();
    assert_eq!(job_id, JobId("job-1".into()));

    let report = poller.wait_resolved().await.unwrap();
    assert_eq!(report.id.as_deref(), Some("3"));
    assert_eq!(backend.calls("latest_report"), 3);

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.calls("latest_report"), 3);
    assert!(matches!(
        poller.state(),
        JobState::Resolved { job_id, .. } if job_id == JobId("job-1".into())
    ));
    assert!(notifier.toasts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn naive_computed_at_resolves() {
    let naive: NumerologyReport =
        serde_json::from_str(r#"{"id": 4, "computed_at": "2024-05-01T10:00:00"}"#).unwrap();
    let backend = FakeBackend::new();
    backend
        .latest
        .set([Ok(Some(pending_report(3))), Ok(Some(naive))]);
    let (poller, _) = phone_poller(&backend);

    poller.submit(&phone()).await.unwrap();
    let report = poller.wait_resolved().await.unwrap();

    assert_eq!(report.id.as_deref(), Some("4"));
    assert_eq!(backend.calls("latest_report"), 2);
}

#[tokio::test(start_paused = true)]
async fn name_reports_poll_every_three_seconds() {
    let backend = FakeBackend::new();
    let notifier = RecordingNotifier::new();
    let poller = JobPoller::new(ReportKind::Name, backend.clone(), notifier);

    poller.submit(&ReportRequest::name("Asha Rao")).await.unwrap();
    time::sleep(Duration::from_millis(9_500)).await;

    assert_eq!(backend.calls("latest_report"), 3);
    assert!(matches!(poller.state(), JobState::Polling { attempts: 3, .. }));
}

#[tokio::test(start_paused = true)]
async fn drop_mid_poll_stops_fetching() {
    let backend = FakeBackend::new();
    let (poller, _) = phone_poller(&backend);

    poller.submit(&phone()).await.unwrap();
    time::sleep(Duration::from_millis(5_000)).await;
    let before = backend.calls("latest_report");
    assert_eq!(before, 2);

    drop(poller);
    time::sleep(Duration::from_secs(120)).await;
    assert_eq!(backend.calls("latest_report"), before);
}

#[tokio::test(start_paused = true)]
async fn poll_errors_are_swallowed() {
    let backend = FakeBackend::new();
    backend.latest.set([
        Err(ApiError::from_response(500, "")),
        Err(ApiError::Network("connection reset".into())),
        Ok(None),
        Ok(Some(ready_report(9))),
    ]);
    let (poller, notifier) = phone_poller(&backend);

    poller.submit(&phone()).await.unwrap();
    let report = poller.wait_resolved().await.unwrap();

    assert_eq!(report.id.as_deref(), Some("9"));
    assert_eq!(backend.calls("latest_report"), 4);
    assert!(notifier.toasts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_submit_toasts_and_never_polls() {
    let backend = FakeBackend::new();
    backend.submit.set([Err(ApiError::from_response(
        400,
        r#"{"phone_number": ["Enter a valid phone number."]}"#,
    ))]);
    let (poller, notifier) = phone_poller(&backend);

    let err = poller.submit(&phone()).await.unwrap_err();
    assert!(matches!(err, JobError::Submit(_)));
    assert_eq!(poller.state(), JobState::Idle);
    assert_eq!(notifier.errors(), vec!["Enter a valid phone number.".to_string()]);

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.calls("latest_report"), 0);
}

#[tokio::test(start_paused = true)]
async fn resubmitting_replaces_the_poll_loop() {
    let backend = FakeBackend::new();
    let (poller, _) = phone_poller(&backend);

    poller.submit(&phone()).await.unwrap();
    time::sleep(Duration::from_millis(3_000)).await;
    assert_eq!(backend.calls("latest_report"), 1);

    let second = poller.submit(&phone()).await.unwrap();
    assert_eq!(second, JobId("job-2".into()));

    // new loop ticks at 5, 7, 9 and 11 s; the old one would add 4, 6, 8, 10 and 12 s
    time::sleep(Duration::from_millis(9_000)).await;
    assert_eq!(backend.calls("latest_report"), 5);
}

#[tokio::test(start_paused = true)]
async fn superseded_submit_response_is_discarded() {
    let backend = FakeBackend::new();
    backend
        .submit_delays
        .set([Duration::from_secs(5), Duration::from_secs(1)]);
    let (poller, notifier) = phone_poller(&backend);

    let first_request = phone();
    let (first, second) = tokio::join!(poller.submit(&first_request), async {
        time::sleep(Duration::from_millis(100)).await;
        poller.submit(&ReportRequest::phone("+15550000000")).await
    });

    assert!(matches!(first, Err(JobError::Superseded)));
    assert_eq!(second.unwrap(), JobId("job-2".into()));
    assert_eq!(poller.state().job_id(), Some(&JobId("job-2".into())));
    assert!(notifier.toasts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_returns_to_idle() {
    let backend = FakeBackend::new();
    let (poller, _) = phone_poller(&backend);
    let mut rx = poller.subscribe();

    poller.submit(&phone()).await.unwrap();
    assert!(matches!(*rx.borrow_and_update(), JobState::Submitted { .. }));

    poller.cancel();
    assert_eq!(poller.state(), JobState::Idle);
    assert_eq!(poller.wait_resolved().await, None);

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.calls("latest_report"), 0);
}

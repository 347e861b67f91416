//! Testing utilities for the Numero workspace
//!
//! In-memory fakes of every backend seam, a notifier that records toasts,
//! and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::NaiveDate;
use numero_api::{
    ApiError, AuthBackend, AuthResponse, BillingRecord, Booking, BookingRequest, ChatBackend,
    ConsultationBackend, Conversation, CreateSubscription, Document, Expert, GoogleLoginRequest,
    JobHandle, JobId, LoginRequest, Message, NotificationBackend, NumerologyBackend,
    NumerologyReport, PasswordResetConfirm, PaymentsBackend, RegisterRequest, RegisterResponse,
    ReportBackend, ReportKind, ReportRequest, SubscriptionStatus, TimeSlot, UpdateSubscription,
    User, VerifyOtpRequest,
};
use numero_core::{Backends, Config, Notifier, NumeroApp, Severity};
use numero_storage::MemoryStore;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Scripted responses
// ---------------------------------------------------------------------------

/// Queue of responses; the last one repeats forever
#[derive(Debug)]
pub struct Script<T>(Mutex<VecDeque<T>>);

impl<T: Clone> Script<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self(Mutex::new(items.into_iter().collect()))
    }

    /// Replace the queue
    pub fn set(&self, items: impl IntoIterator<Item = T>) {
        *self.0.lock() = items.into_iter().collect();
    }

    /// Next response, `None` if never scripted
    pub fn next(&self) -> Option<T> {
        let mut queue = self.0.lock();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl<T: Clone> Default for Script<T> {
    fn default() -> Self {
        Self::new([])
    }
}

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

/// Every backend trait, in memory
///
/// Defaults: logins succeed with a free user, reports are pending, the
/// unread count is zero, conversations are empty.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub auth: Script<Result<AuthResponse, ApiError>>,
    pub profile: Script<Result<User, ApiError>>,
    pub logout: Script<Result<(), ApiError>>,
    pub submit: Script<Result<JobHandle, ApiError>>,
    /// Delay of each submit call, in call order
    pub submit_delays: Script<Duration>,
    pub latest: Script<Result<Option<NumerologyReport>, ApiError>>,
    pub unread: Script<Result<u64, ApiError>>,
    pub messages: Script<Result<Vec<Message>, ApiError>>,
    token: Mutex<Option<String>>,
    calls: Mutex<BTreeMap<&'static str, u32>>,
    submitted: Mutex<Vec<ReportRequest>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Times `endpoint` was called
    pub fn calls(&self, endpoint: &str) -> u32 {
        self.calls.lock().get(endpoint).copied().unwrap_or(0)
    }

    /// Bearer token last set by the auth service
    pub fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    /// Report requests that reached the backend
    pub fn submitted(&self) -> Vec<ReportRequest> {
        self.submitted.lock().clone()
    }

    fn hit(&self, endpoint: &'static str) -> u32 {
        let mut calls = self.calls.lock();
        let n = calls.entry(endpoint).or_insert(0);
        *n += 1;
        *n
    }

    fn require_token(&self) -> Result<(), ApiError> {
        if self.token.lock().is_some() {
            Ok(())
        } else {
            Err(ApiError::NotAuthenticated)
        }
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        self.hit("register");
        Ok(RegisterResponse {
            message: Some("OTP sent".into()),
            email: Some(req.email.clone()),
        })
    }

    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<AuthResponse, ApiError> {
        self.hit("verify_otp");
        self.auth
            .next()
            .unwrap_or_else(|| Ok(auth_response(user(&req.email, "free"))))
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.hit("login");
        self.auth
            .next()
            .unwrap_or_else(|| Ok(auth_response(user(&req.email, "free"))))
    }

    async fn login_with_google(&self, _: &GoogleLoginRequest) -> Result<AuthResponse, ApiError> {
        self.hit("login_with_google");
        self.auth
            .next()
            .unwrap_or_else(|| Ok(auth_response(user("google@example.com", "free"))))
    }

    async fn logout(&self, _: &str) -> Result<(), ApiError> {
        self.hit("logout");
        self.logout.next().unwrap_or(Ok(()))
    }

    async fn request_password_reset(&self, _: &str) -> Result<(), ApiError> {
        self.hit("request_password_reset");
        Ok(())
    }

    async fn confirm_password_reset(&self, _: &PasswordResetConfirm) -> Result<(), ApiError> {
        self.hit("confirm_password_reset");
        Ok(())
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.hit("profile");
        self.require_token()?;
        self.profile
            .next()
            .unwrap_or_else(|| Err(ApiError::from_response(404, "")))
    }

    fn set_access_token(&self, token: Option<&str>) {
        *self.token.lock() = token.map(str::to_string);
    }
}

#[async_trait]
impl ReportBackend for FakeBackend {
    async fn generate_report(&self, req: &ReportRequest) -> Result<JobHandle, ApiError> {
        let n = self.hit("generate_report");
        if let Some(delay) = self.submit_delays.next() {
            tokio::time::sleep(delay).await;
        }
        self.submitted.lock().push(req.clone());
        self.submit
            .next()
            .unwrap_or_else(|| Ok(job_handle(&format!("job-{n}"))))
    }

    async fn latest_report(&self, _: ReportKind) -> Result<Option<NumerologyReport>, ApiError> {
        self.hit("latest_report");
        self.latest.next().unwrap_or(Ok(None))
    }
}

#[async_trait]
impl NotificationBackend for FakeBackend {
    async fn unread_count(&self) -> Result<u64, ApiError> {
        self.hit("unread_count");
        self.unread.next().unwrap_or(Ok(0))
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.hit("conversations");
        Ok(vec![from_json(json!({ "id": 1, "title": "Consultation" }))])
    }

    async fn messages(&self, _: &str) -> Result<Vec<Message>, ApiError> {
        self.hit("messages");
        self.messages.next().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send_message(&self, _: &str, content: &str) -> Result<Message, ApiError> {
        let n = self.hit("send_message");
        Ok(message(&format!("sent-{n}"), content))
    }
}

#[async_trait]
impl NumerologyBackend for FakeBackend {
    async fn birth_chart(&self) -> Result<Document, ApiError> {
        self.hit("birth_chart");
        Ok(json!({ "life_path_number": 7 }))
    }

    async fn daily_reading(&self, date: Option<NaiveDate>) -> Result<Document, ApiError> {
        self.hit("daily_reading");
        Ok(json!({
            "date": date.map(|d| d.to_string()),
            "personal_day_number": 5,
        }))
    }

    async fn weekly_report(&self) -> Result<Document, ApiError> {
        self.hit("weekly_report");
        Ok(json!({ "week": 1 }))
    }

    async fn yearly_report(&self, year: Option<i32>) -> Result<Document, ApiError> {
        self.hit("yearly_report");
        Ok(json!({ "year": year }))
    }

    async fn auspicious_dates(
        &self,
        event_type: &str,
        from: NaiveDate,
        _: NaiveDate,
    ) -> Result<Document, ApiError> {
        self.hit("auspicious_dates");
        Ok(json!({ "event_type": event_type, "dates": [from.to_string()] }))
    }

    async fn report_preview(&self, req: &ReportRequest) -> Result<Document, ApiError> {
        self.hit("report_preview");
        Ok(json!({ "kind": req.kind().segment() }))
    }
}

#[async_trait]
impl PaymentsBackend for FakeBackend {
    async fn subscription_status(&self) -> Result<SubscriptionStatus, ApiError> {
        self.hit("subscription_status");
        Ok(from_json(json!({ "plan": "free", "status": "active" })))
    }

    async fn create_subscription(
        &self,
        req: &CreateSubscription,
    ) -> Result<SubscriptionStatus, ApiError> {
        self.hit("create_subscription");
        Ok(from_json(json!({ "plan": req.plan, "status": "active" })))
    }

    async fn update_subscription(
        &self,
        req: &UpdateSubscription,
    ) -> Result<SubscriptionStatus, ApiError> {
        self.hit("update_subscription");
        Ok(from_json(json!({ "plan": req.plan, "status": "active" })))
    }

    async fn cancel_subscription(&self) -> Result<SubscriptionStatus, ApiError> {
        self.hit("cancel_subscription");
        Ok(from_json(
            json!({ "status": "active", "cancel_at_period_end": true }),
        ))
    }

    async fn billing_history(&self) -> Result<Vec<BillingRecord>, ApiError> {
        self.hit("billing_history");
        Ok(Vec::new())
    }
}

#[async_trait]
impl ConsultationBackend for FakeBackend {
    async fn experts(&self) -> Result<Vec<Expert>, ApiError> {
        self.hit("experts");
        Ok(vec![from_json(json!({ "id": 1, "name": "Dr. Rao" }))])
    }

    async fn time_slots(&self, _: &str, _: NaiveDate) -> Result<Vec<TimeSlot>, ApiError> {
        self.hit("time_slots");
        Ok(Vec::new())
    }

    async fn book(&self, _: &BookingRequest) -> Result<Booking, ApiError> {
        self.hit("book");
        Ok(from_json(json!({ "id": 1, "status": "confirmed" })))
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Notifier that keeps every toast
#[derive(Debug, Default)]
pub struct RecordingNotifier(Mutex<Vec<(Severity, String)>>);

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn toasts(&self) -> Vec<(Severity, String)> {
        self.0.lock().clone()
    }

    /// Messages of error toasts only
    pub fn errors(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|(s, _)| *s == Severity::Error)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.0.lock().push((severity, message.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).expect("fixture must decode")
}

pub fn user(email: &str, plan: &str) -> User {
    User::new("1", email).with_plan(plan)
}

pub fn auth_response(user: User) -> AuthResponse {
    AuthResponse {
        access: "access-token".into(),
        refresh: "refresh-token".into(),
        user,
    }
}

pub fn job_handle(id: &str) -> JobHandle {
    JobHandle {
        job_id: JobId(id.to_string()),
        status: Some("queued".into()),
    }
}

/// Report without `computed_at`
pub fn pending_report(id: u32) -> NumerologyReport {
    from_json(json!({ "id": id, "computed_at": null }))
}

/// Report with `computed_at` set
pub fn ready_report(id: u32) -> NumerologyReport {
    from_json(json!({
        "id": id,
        "computed_at": "2024-05-01T10:00:00Z",
        "lucky_number": 7,
    }))
}

pub fn message(id: &str, content: &str) -> Message {
    from_json(json!({
        "id": id,
        "sender": "expert",
        "content": content,
        "created_at": "2024-05-01T10:00:00Z",
    }))
}

/// App over a fresh memory store and recording notifier
pub fn setup_test_app(
    backend: &Arc<FakeBackend>,
) -> (NumeroApp, Arc<MemoryStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let app = setup_test_app_with_store(backend, store.clone());
    (app.0, store, app.1)
}

/// App over an existing store, as after a restart
pub fn setup_test_app_with_store(
    backend: &Arc<FakeBackend>,
    store: Arc<MemoryStore>,
) -> (NumeroApp, Arc<RecordingNotifier>) {
    let notifier = RecordingNotifier::new();
    let app = NumeroApp::new(
        Config::default(),
        store,
        notifier.clone(),
        Backends::uniform(backend.clone()),
    );
    (app, notifier)
}

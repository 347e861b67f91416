//! Request and response bodies
//!
//! Shapes follow the backend's JSON. Fields the client never reads are kept
//! in flattened `extra` maps so nothing is lost when a value is cached and
//! written back (the persisted `user` record in particular).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use numero_subscription::SubscribedUser;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Untyped backend document (birth chart, weekly report, ...)
pub type Document = Value;

/// Accept ids sent either as numbers or strings
fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Users and sessions
// ---------------------------------------------------------------------------

/// Authenticated user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Backend plan (`free|basic|premium|elite`)
    #[serde(default)]
    pub subscription_plan: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Minimal user, mostly for fixtures
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            subscription_plan: None,
            is_premium: false,
            is_verified: false,
            extra: Map::new(),
        }
    }

    /// With subscription plan
    #[inline]
    #[must_use]
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.subscription_plan = Some(plan.into());
        self
    }

    /// With premium flag
    #[inline]
    #[must_use]
    pub fn with_premium(mut self, premium: bool) -> Self {
        self.is_premium = premium;
        self
    }

    /// "First Last", falling back to the email
    #[must_use]
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }
}

impl SubscribedUser for User {
    fn subscription_plan(&self) -> Option<&str> {
        self.subscription_plan.as_deref()
    }

    fn is_premium(&self) -> bool {
        self.is_premium
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Registration is confirmed by OTP before tokens are issued
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoogleLoginRequest {
    /// Credential issued by Google sign-in
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub new_password: String,
}

/// Tokens plus the user they belong to
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "access_token")]
    pub access: String,
    #[serde(alias = "refresh_token")]
    pub refresh: String,
    pub user: User,
}

// ---------------------------------------------------------------------------
// Report jobs
// ---------------------------------------------------------------------------

/// Opaque handle of a backend report job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobHandle {
    pub job_id: JobId,
    #[serde(default)]
    pub status: Option<String>,
}

/// Which report pipeline a job belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Name,
    Phone,
}

impl ReportKind {
    /// Path segment of the pipeline
    #[inline]
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Name => "name-numerology",
            Self::Phone => "phone-numerology",
        }
    }

    /// Feature name used for gating
    #[inline]
    #[must_use]
    pub fn feature(self) -> &'static str {
        self.segment()
    }

    /// Usage counter charged per generated report
    #[inline]
    #[must_use]
    pub fn usage_counter(self) -> &'static str {
        match self {
            Self::Name => "nameAnalyses",
            Self::Phone => "phoneAnalyses",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameReportRequest {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    /// `pythagorean` or `chaldean`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneReportRequest {
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

/// Input of a report generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportRequest {
    Name(NameReportRequest),
    Phone(PhoneReportRequest),
}

impl ReportRequest {
    /// Name report for `full_name`
    #[must_use]
    pub fn name(full_name: impl Into<String>) -> Self {
        Self::Name(NameReportRequest {
            full_name: full_name.into(),
            birth_date: None,
            system: None,
        })
    }

    /// Phone report for `phone_number`
    #[must_use]
    pub fn phone(phone_number: impl Into<String>) -> Self {
        Self::Phone(PhoneReportRequest {
            phone_number: phone_number.into(),
            country_code: None,
        })
    }

    /// Pipeline this request goes to
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::Name(_) => ReportKind::Name,
            Self::Phone(_) => ReportKind::Phone,
        }
    }
}

/// Persisted report; ready once `computed_at` is non-null
///
/// `computed_at` stays raw: backends without time zone support send naive
/// timestamps, and readiness must not hinge on the format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumerologyReport {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub computed_at: Option<Value>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl NumerologyReport {
    /// Whether the backend finished computing it
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.computed_at.is_some()
    }

    /// `computed_at` as a UTC timestamp; naive values are taken as UTC
    #[must_use]
    pub fn computed_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.computed_at.as_ref()?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|t| t.and_utc())
            })
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

impl SubscriptionStatus {
    /// `active` or `trialing`
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_deref(), Some("active" | "trialing"))
    }
}

/// New subscription; the card is already tokenised by the payment SDK
#[derive(Debug, Clone, Serialize)]
pub struct CreateSubscription {
    pub plan: String,
    pub payment_method_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSubscription {
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BillingRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Minor currency units
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "usd".to_string()
}

// ---------------------------------------------------------------------------
// Consultations and chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Expert {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeSlot {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest {
    pub expert_id: String,
    pub time_slot_id: String,
    pub consultation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Booking {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub sender: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UnreadCount {
    #[serde(alias = "count")]
    pub(crate) unread_count: u64,
}

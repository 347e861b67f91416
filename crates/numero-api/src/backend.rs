//! Backend traits
//!
//! Services depend on these rather than on [`ApiClient`](crate::ApiClient)
//! directly. The HTTP client implements all of them; tests use in-memory fakes.

use crate::error::ApiError;
use crate::models::{
    AuthResponse, BillingRecord, Booking, BookingRequest, Conversation, CreateSubscription,
    Document, Expert, GoogleLoginRequest, JobHandle, LoginRequest, Message, NumerologyReport,
    PasswordResetConfirm, RegisterRequest, RegisterResponse, ReportKind, ReportRequest,
    SubscriptionStatus, TimeSlot, UpdateSubscription, User, VerifyOtpRequest,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Session lifecycle endpoints
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST /auth/register/`
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ApiError>;

    /// `POST /auth/verify-otp/`
    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<AuthResponse, ApiError>;

    /// `POST /auth/login/`
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError>;

    /// `POST /auth/social/google/`
    async fn login_with_google(&self, req: &GoogleLoginRequest) -> Result<AuthResponse, ApiError>;

    /// `POST /auth/logout/`
    async fn logout(&self, refresh_token: &str) -> Result<(), ApiError>;

    /// `POST /auth/reset-password/`
    async fn request_password_reset(&self, email: &str) -> Result<(), ApiError>;

    /// `POST /auth/reset-password/token/confirm/`
    async fn confirm_password_reset(&self, req: &PasswordResetConfirm) -> Result<(), ApiError>;

    /// `GET /users/profile/`
    async fn profile(&self) -> Result<User, ApiError>;

    /// Bearer token attached to subsequent calls
    fn set_access_token(&self, token: Option<&str>);
}

/// Job-style report generation
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Start a report job; the heavy work runs backend-side
    async fn generate_report(&self, req: &ReportRequest) -> Result<JobHandle, ApiError>;

    /// Latest persisted report of this kind for the current user
    async fn latest_report(&self, kind: ReportKind) -> Result<Option<NumerologyReport>, ApiError>;
}

/// Notification badge
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    /// Number of unread notifications
    async fn unread_count(&self) -> Result<u64, ApiError>;
}

/// Consultation chat
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Conversations of the current user
    async fn conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// Messages of one conversation, oldest first
    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError>;

    /// Post a message
    async fn send_message(&self, conversation_id: &str, content: &str)
        -> Result<Message, ApiError>;
}

/// Synchronous numerology reads
#[async_trait]
pub trait NumerologyBackend: Send + Sync {
    async fn birth_chart(&self) -> Result<Document, ApiError>;

    async fn daily_reading(&self, date: Option<NaiveDate>) -> Result<Document, ApiError>;

    async fn weekly_report(&self) -> Result<Document, ApiError>;

    async fn yearly_report(&self, year: Option<i32>) -> Result<Document, ApiError>;

    async fn auspicious_dates(
        &self,
        event_type: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Document, ApiError>;

    /// Free preview shown before a full report is generated
    async fn report_preview(&self, req: &ReportRequest) -> Result<Document, ApiError>;
}

/// Subscription billing
#[async_trait]
pub trait PaymentsBackend: Send + Sync {
    async fn subscription_status(&self) -> Result<SubscriptionStatus, ApiError>;

    async fn create_subscription(
        &self,
        req: &CreateSubscription,
    ) -> Result<SubscriptionStatus, ApiError>;

    async fn update_subscription(
        &self,
        req: &UpdateSubscription,
    ) -> Result<SubscriptionStatus, ApiError>;

    async fn cancel_subscription(&self) -> Result<SubscriptionStatus, ApiError>;

    async fn billing_history(&self) -> Result<Vec<BillingRecord>, ApiError>;
}

/// Expert consultations
#[async_trait]
pub trait ConsultationBackend: Send + Sync {
    async fn experts(&self) -> Result<Vec<Expert>, ApiError>;

    async fn time_slots(&self, expert_id: &str, date: NaiveDate)
        -> Result<Vec<TimeSlot>, ApiError>;

    async fn book(&self, req: &BookingRequest) -> Result<Booking, ApiError>;
}

//! Backend trait implementations for [`ApiClient`]

use crate::backend::{
    AuthBackend, ChatBackend, ConsultationBackend, NotificationBackend, NumerologyBackend,
    PaymentsBackend, ReportBackend,
};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{
    AuthResponse, BillingRecord, Booking, BookingRequest, Conversation, CreateSubscription,
    Document, Expert, GoogleLoginRequest, JobHandle, LoginRequest, Message, NumerologyReport,
    PasswordResetConfirm, RegisterRequest, RegisterResponse, ReportKind, ReportRequest,
    SubscriptionStatus, TimeSlot, UnreadCount, UpdateSubscription, User, VerifyOtpRequest,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::json;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

fn idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        self.send_json(self.request(Method::POST, "/auth/register/").json(req))
            .await
    }

    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<AuthResponse, ApiError> {
        self.send_json(self.request(Method::POST, "/auth/verify-otp/").json(req))
            .await
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.send_json(self.request(Method::POST, "/auth/login/").json(req))
            .await
    }

    async fn login_with_google(&self, req: &GoogleLoginRequest) -> Result<AuthResponse, ApiError> {
        self.send_json(self.request(Method::POST, "/auth/social/google/").json(req))
            .await
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        let body = json!({ "refresh": refresh_token });
        self.send_empty(self.request(Method::POST, "/auth/logout/").json(&body))
            .await
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let body = json!({ "email": email });
        self.send_empty(self.request(Method::POST, "/auth/reset-password/").json(&body))
            .await
    }

    async fn confirm_password_reset(&self, req: &PasswordResetConfirm) -> Result<(), ApiError> {
        self.send_empty(
            self.request(Method::POST, "/auth/reset-password/token/confirm/")
                .json(req),
        )
        .await
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.send_json(self.authed(Method::GET, "/users/profile/")?)
            .await
    }

    fn set_access_token(&self, token: Option<&str>) {
        self.set_token(token);
    }
}

#[async_trait]
impl ReportBackend for ApiClient {
    async fn generate_report(&self, req: &ReportRequest) -> Result<JobHandle, ApiError> {
        let path = format!("/numerology/{}/generate/", req.kind().segment());
        self.send_json(self.authed(Method::POST, &path)?.json(req))
            .await
    }

    async fn latest_report(&self, kind: ReportKind) -> Result<Option<NumerologyReport>, ApiError> {
        let path = format!("/numerology/{}/latest/", kind.segment());
        self.send_optional(self.authed(Method::GET, &path)?).await
    }
}

#[async_trait]
impl NotificationBackend for ApiClient {
    async fn unread_count(&self) -> Result<u64, ApiError> {
        let count: UnreadCount = self
            .send_json(self.authed(Method::GET, "/notifications/unread-count/")?)
            .await?;
        Ok(count.unread_count)
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.send_json(self.authed(Method::GET, "/consultations/conversations/")?)
            .await
    }

    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        let path = format!("/consultations/conversations/{conversation_id}/messages/");
        self.send_json(self.authed(Method::GET, &path)?).await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<Message, ApiError> {
        let path = format!("/consultations/conversations/{conversation_id}/messages/");
        let body = json!({ "content": content });
        self.send_json(self.authed(Method::POST, &path)?.json(&body))
            .await
    }
}

#[async_trait]
impl NumerologyBackend for ApiClient {
    async fn birth_chart(&self) -> Result<Document, ApiError> {
        self.send_json(self.authed(Method::GET, "/numerology/birth-chart/")?)
            .await
    }

    async fn daily_reading(&self, date: Option<NaiveDate>) -> Result<Document, ApiError> {
        let mut req = self.authed(Method::GET, "/numerology/daily-reading/")?;
        if let Some(date) = date {
            req = req.query(&[("date", date.to_string())]);
        }
        self.send_json(req).await
    }

    async fn weekly_report(&self) -> Result<Document, ApiError> {
        self.send_json(self.authed(Method::GET, "/numerology/weekly-report/")?)
            .await
    }

    async fn yearly_report(&self, year: Option<i32>) -> Result<Document, ApiError> {
        let mut req = self.authed(Method::GET, "/numerology/yearly-report/")?;
        if let Some(year) = year {
            req = req.query(&[("year", year)]);
        }
        self.send_json(req).await
    }

    async fn auspicious_dates(
        &self,
        event_type: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Document, ApiError> {
        let req = self
            .authed(Method::GET, "/numerology/auspicious-dates/")?
            .query(&[
                ("event_type", event_type.to_string()),
                ("start_date", from.to_string()),
                ("end_date", to.to_string()),
            ]);
        self.send_json(req).await
    }

    async fn report_preview(&self, req: &ReportRequest) -> Result<Document, ApiError> {
        let path = format!("/numerology/{}/preview/", req.kind().segment());
        self.send_json(self.request(Method::POST, &path).json(req))
            .await
    }
}

#[async_trait]
impl PaymentsBackend for ApiClient {
    async fn subscription_status(&self) -> Result<SubscriptionStatus, ApiError> {
        self.send_json(self.authed(Method::GET, "/payments/subscription/status/")?)
            .await
    }

    async fn create_subscription(
        &self,
        req: &CreateSubscription,
    ) -> Result<SubscriptionStatus, ApiError> {
        let builder = self
            .authed(Method::POST, "/payments/subscription/create/")?
            .header(IDEMPOTENCY_HEADER, idempotency_key())
            .json(req);
        self.send_json(builder).await
    }

    async fn update_subscription(
        &self,
        req: &UpdateSubscription,
    ) -> Result<SubscriptionStatus, ApiError> {
        self.send_json(
            self.authed(Method::POST, "/payments/subscription/update/")?
                .json(req),
        )
        .await
    }

    async fn cancel_subscription(&self) -> Result<SubscriptionStatus, ApiError> {
        self.send_json(self.authed(Method::POST, "/payments/subscription/cancel/")?)
            .await
    }

    async fn billing_history(&self) -> Result<Vec<BillingRecord>, ApiError> {
        self.send_json(self.authed(Method::GET, "/payments/billing-history/")?)
            .await
    }
}

#[async_trait]
impl ConsultationBackend for ApiClient {
    async fn experts(&self) -> Result<Vec<Expert>, ApiError> {
        self.send_json(self.request(Method::GET, "/consultations/experts/"))
            .await
    }

    async fn time_slots(
        &self,
        expert_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, ApiError> {
        let path = format!("/consultations/experts/{expert_id}/time-slots/");
        let req = self
            .authed(Method::GET, &path)?
            .query(&[("date", date.to_string())]);
        self.send_json(req).await
    }

    async fn book(&self, req: &BookingRequest) -> Result<Booking, ApiError> {
        let builder = self
            .authed(Method::POST, "/consultations/book/")?
            .header(IDEMPOTENCY_HEADER, idempotency_key())
            .json(req);
        self.send_json(builder).await
    }
}

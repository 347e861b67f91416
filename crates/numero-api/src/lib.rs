//! Numero API
//!
//! Typed client for the numerology backend. All substantive computation
//! (numerology, report synthesis, billing, chat) happens server-side; this
//! crate only shapes requests and decodes responses.
//!
//! # Core Concepts
//!
//! - [`ApiClient`]: `reqwest` client with base URL and bearer token
//! - [`ApiError`]: transport, status and decode failures with a user-facing message
//! - Backend traits ([`AuthBackend`], [`ReportBackend`], ...): seams the
//!   services depend on, so tests can swap in fakes
//! - [`models`]: request and response bodies
//!
//! # Example
//!
//! ```rust,ignore
//! use numero_api::{ApiClient, ApiConfig, AuthBackend, LoginRequest};
//!
//! # async fn example() -> Result<(), numero_api::ApiError> {
//! let client = ApiClient::new(ApiConfig::new("https://api.example.com/api"))?;
//! let session = client.login(&LoginRequest::new("a@b.c", "hunter22")).await?;
//! client.set_access_token(Some(&session.access));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backend;
pub mod client;
pub mod error;
pub mod models;

mod endpoints;

pub use backend::{
    AuthBackend, ChatBackend, ConsultationBackend, NotificationBackend, NumerologyBackend,
    PaymentsBackend, ReportBackend,
};
pub use client::{ApiClient, ApiConfig};
pub use error::{ApiError, GENERIC_ERROR_MESSAGE};
pub use models::{
    AuthResponse, BillingRecord, Booking, BookingRequest, Conversation, CreateSubscription,
    Document, Expert, GoogleLoginRequest, JobHandle, JobId, LoginRequest, Message,
    NameReportRequest, NumerologyReport, PasswordResetConfirm, PhoneReportRequest,
    RegisterRequest, RegisterResponse, ReportKind, ReportRequest, SubscriptionStatus, TimeSlot,
    UpdateSubscription, User, VerifyOtpRequest,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Numero Core
//!
//! Client services for the numerology backend, wired by an explicit
//! composition root instead of ambient globals:
//! - Auth session with persisted tokens and user-change listeners
//! - Subscription tier and usage kept in sync with the user
//! - Client-side validation ahead of every network call
//! - Report job polling, unread badge polling, conversation watching
//! - Toasts through an injected [`Notifier`]
//!
//! # Example
//!
//! ```rust,ignore
//! use numero_core::{Config, NumeroApp, TracingNotifier};
//! use numero_api::{ReportKind, ReportRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), numero_core::AppError> {
//! let app = NumeroApp::from_config(Config::load(None)?, Arc::new(TracingNotifier))?;
//! app.auth().login("asha@example.com", "correct-horse").await.ok();
//!
//! let poller = app.job_poller(ReportKind::Phone);
//! app.generate_report(&poller, ReportRequest::phone("+15551234567")).await?;
//! let report = poller.wait_resolved().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod polling;
pub mod preferences;
pub mod validation;

pub use app::{Backends, NumeroApp};
pub use auth::{AuthListener, AuthService};
pub use config::{Config, PollingConfig};
pub use error::{AppError, AuthError, ConfigError, JobError};
pub use notify::{Notifier, Severity, TracingNotifier};
pub use polling::{
    ComputedAt, ConversationWatcher, JobPoller, JobState, PollingPolicy, ReadinessPredicate,
    RequestGeneration, UnreadCountPoller, UnreadState,
};
pub use preferences::Preferences;
pub use validation::{RegistrationForm, ValidationError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Numero Core
    pub use crate::{
        AppError, AuthService, Config, JobPoller, JobState, Notifier, NumeroApp, PollingPolicy,
        Severity,
    };
    pub use numero_api::{ReportKind, ReportRequest, User};
    pub use numero_subscription::{GateDecision, Tier};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

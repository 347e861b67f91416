//! Error types for Numero Core
//!
//! - Session flows ([`AuthError`])
//! - Configuration loading ([`ConfigError`])
//! - Report jobs ([`JobError`])
//! - Gated actions on the composition root ([`AppError`])

use crate::validation::ValidationError;
use numero_api::ApiError;
use numero_subscription::Tier;
use std::path::PathBuf;

/// Session operation failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Rejected before any network call
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Backend call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Operation needs a session
    #[error("not signed in")]
    NotAuthenticated,
}

impl AuthError {
    /// Text suitable for a toast or inline error
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Api(e) => e.user_message(),
            Self::NotAuthenticated => "Please sign in to continue.".to_string(),
        }
    }
}

/// Configuration failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`Config`](crate::config::Config)
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Values parse but make no sense
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Report job failure
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Generate call failed; polling never started
    #[error("report submission failed: {0}")]
    Submit(#[source] ApiError),

    /// A newer submission replaced this one before it returned
    #[error("submission superseded by a newer request")]
    Superseded,

    /// Request sent to a poller of the other report kind
    #[error("poller handles {expected} reports, got a {actual} request")]
    KindMismatch {
        expected: numero_api::ReportKind,
        actual: numero_api::ReportKind,
    },
}

/// Failure of a gated action
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Current tier is below the feature's required tier
    #[error("{feature} requires the {required} plan")]
    UpgradeRequired { feature: String, required: Tier },

    /// Usage counter exhausted for this period
    #[error("{feature} limit reached")]
    LimitReached { feature: String },

    /// Input rejected before any network call
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Report job failed
    #[error(transparent)]
    Job(#[from] JobError),

    /// Client could not be built
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Whether the user can fix this by upgrading
    #[inline]
    #[must_use]
    pub fn needs_upgrade(&self) -> bool {
        matches!(self, Self::UpgradeRequired { .. } | Self::LimitReached { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_messages() {
        let err = AuthError::from(ValidationError::PasswordMismatch);
        assert_eq!(err.user_message(), "passwords do not match");

        let err = AuthError::from(ApiError::from_response(400, r#"{"detail": "Bad OTP"}"#));
        assert_eq!(err.user_message(), "Bad OTP");

        let err = AuthError::from(ApiError::from_response(502, ""));
        assert_eq!(err.user_message(), numero_api::GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn upgrade_errors() {
        let err = AppError::UpgradeRequired {
            feature: "phone-numerology".into(),
            required: Tier::Premium,
        };
        assert!(err.needs_upgrade());
        assert_eq!(err.to_string(), "phone-numerology requires the premium plan");
        assert!(!AppError::from(JobError::Superseded).needs_upgrade());
    }
}

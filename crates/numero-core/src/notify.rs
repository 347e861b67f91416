//! User-visible notifications (toasts)
//!
//! Services report outcomes the user should see through a [`Notifier`].
//! The default [`TracingNotifier`] just logs; front ends plug in their own.

use std::fmt;

/// Toast flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Neutral information
    Info,
    /// Action succeeded
    Success,
    /// Action failed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        })
    }
}

/// Sink for user-visible messages
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Show a message
    fn notify(&self, severity: Severity, message: &str);

    /// Show an error toast
    fn error(&self, message: &str) {
        self.notify(Severity::Error, message);
    }

    /// Show a success toast
    fn success(&self, message: &str) {
        self.notify(Severity::Success, message);
    }

    /// Show an informational toast
    fn info(&self, message: &str) {
        self.notify(Severity::Info, message);
    }
}

/// Notifier that writes toasts to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!(target: "numero::toast", "{message}"),
            Severity::Success | Severity::Info => {
                tracing::info!(target: "numero::toast", %severity, "{message}");
            }
        }
    }
}

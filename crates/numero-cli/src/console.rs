//! Terminal output: toasts on stderr and log setup

use numero_core::{Notifier, Severity};
use tracing_subscriber::EnvFilter;

/// Prints toasts to stderr
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        eprintln!("{}", render(severity, message));
    }
}

fn render(severity: Severity, message: &str) -> String {
    let tag = match severity {
        Severity::Info => "info",
        Severity::Success => "ok",
        Severity::Error => "error",
    };
    format!("[{tag}] {message}")
}

/// Install the global subscriber; `RUST_LOG` wins over `default_level`
pub(crate) fn init_logging(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }
}

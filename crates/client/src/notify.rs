//! User-visible notices
//!
//! Toasts and alerts in a browser; the CLI prints them, tests record them.

use tracing::{error, info, warn};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// Sink for transient user-visible notices
pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, text: &str);

    fn info(&self, text: &str) {
        self.notify(Level::Info, text);
    }

    fn warning(&self, text: &str) {
        self.notify(Level::Warning, text);
    }

    fn error(&self, text: &str) {
        self.notify(Level::Error, text);
    }
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: Level, text: &str) {
        match level {
            Level::Info => info!(target: "airshipui::notice", "{}", text),
            Level::Warning => warn!(target: "airshipui::notice", "{}", text),
            Level::Error => error!(target: "airshipui::notice", "{}", text),
        }
    }
}

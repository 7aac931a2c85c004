//! Desktop notification capability

use crate::diff::ChangeSet;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub const ALERT_TITLE: &str = "heimdall alert";

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);

    /// Summarize a non-empty change set; empty sets are not announced
    fn notify_changes(&self, changes: &ChangeSet) {
        if !changes.is_empty() {
            self.notify(ALERT_TITLE, &format!("Changes: {}", changes.summary()));
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}

/// Delivers through the freedesktop `notify-send` helper
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
    app_name: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self { program: "notify-send".to_string(), app_name: "Heimdall".to_string() }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let status = Command::new(&self.program)
            .args(["--app-name", &self.app_name, title, body])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(s) if s.success() => debug!("Notification sent: {}", body),
            Ok(s) => warn!("Notification helper exited with {}", s),
            Err(e) => warn!("Notification error: {}", e),
        }
    }
}

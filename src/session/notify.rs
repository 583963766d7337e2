//! Build notifications.
//!
//! Delivery is fire-and-forget: a notifier never reports failure back to
//! the session.

use std::path::PathBuf;
use std::process::Stdio;

/// Title used for every build notification.
pub const NOTIFICATION_TITLE: &str = "Standalone Sass";

/// A desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: Option<String>,
    pub message: String,
    pub icon: Option<PathBuf>,
}

impl Notification {
    /// A notification announcing a successful recompile.
    #[must_use]
    pub fn success(icon: Option<PathBuf>) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            subtitle: None,
            message: "Sass Compilation Successful".to_string(),
            icon,
        }
    }

    /// A notification announcing a failed compile.
    #[must_use]
    pub fn failure(message: impl Into<String>, icon: Option<PathBuf>) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            subtitle: Some("Sass Compilation Failed".to_string()),
            message: message.into(),
            icon,
        }
    }
}

/// A sink for build notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) {}
}

/// Logs notifications through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::info!(
            title = %notification.title,
            subtitle = notification.subtitle.as_deref(),
            message = %notification.message,
            "Notification"
        );
    }
}

/// Shows notifications through the platform's notification command
/// (`notify-send` or `osascript`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "macos")]
    fn command(notification: &Notification) -> tokio::process::Command {
        let escape = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");
        let mut script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape(&notification.message),
            escape(&notification.title)
        );
        if let Some(subtitle) = &notification.subtitle {
            script.push_str(&format!(" subtitle \"{}\"", escape(subtitle)));
        }

        let mut cmd = tokio::process::Command::new("osascript");
        cmd.arg("-e").arg(script);
        cmd
    }

    #[cfg(not(target_os = "macos"))]
    fn command(notification: &Notification) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("notify-send");
        if let Some(icon) = &notification.icon {
            cmd.arg("--icon").arg(icon);
        }
        let body = match &notification.subtitle {
            Some(subtitle) => format!("{subtitle}\n{}", notification.message),
            None => notification.message.clone(),
        };
        cmd.arg(&notification.title).arg(body);
        cmd
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        let spawned = Self::command(notification)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        // The child is reaped in the background once dropped.
        if let Err(e) = spawned {
            tracing::debug!(error = %e, "Desktop notification unavailable");
        }
    }
}

//! Desktop notifications
//!
//! One [`NotificationSink`] per host platform, picked once by
//! [`Notifier::for_host`]. Delivery is best-effort: the [`Notifier`] logs
//! dispatch failures and never hands them back to the sync run.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

use crate::config::NotificationConfig;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Info => "info",
        }
    }

    /// freedesktop urgency level
    pub fn urgency(&self) -> &'static str {
        match self {
            Severity::Success | Severity::Warning => "normal",
            Severity::Error => "critical",
            Severity::Info => "low",
        }
    }

    /// freedesktop icon name
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "emblem-default",
            Severity::Warning => "dialog-warning",
            Severity::Error => "dialog-error",
            Severity::Info => "dialog-information",
        }
    }

    /// macOS notification sound
    pub fn sound(&self) -> &'static str {
        match self {
            Severity::Success => "Glass",
            Severity::Warning => "Purr",
            Severity::Error => "Basso",
            Severity::Info => "Pop",
        }
    }
}

/// A message ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub app_name: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

/// Delivers notifications through one native mechanism
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &'static str;
}

/// Linux and BSD desktops via `notify-send`
pub struct NotifySend;

impl NotifySend {
    /// Title and message follow `--` so text starting with `-` is not read as an option
    pub fn args(notification: &Notification) -> Vec<String> {
        vec![
            "-a".to_string(),
            notification.app_name.clone(),
            "-u".to_string(),
            notification.severity.urgency().to_string(),
            "-i".to_string(),
            notification.severity.icon().to_string(),
            "--".to_string(),
            notification.title.clone(),
            notification.message.clone(),
        ]
    }
}

#[async_trait]
impl NotificationSink for NotifySend {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let output = AsyncCommand::new("notify-send")
            .args(Self::args(notification))
            .output()
            .await
            .context("Failed to execute notify-send")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("notify-send failed: {}", stderr.trim()));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "notify-send"
    }
}

/// macOS Notification Center via `osascript`
pub struct AppleScript;

impl AppleScript {
    pub fn script(notification: &Notification) -> String {
        format!(
            "display notification \"{}\" with title \"{}\" subtitle \"{}\" sound name \"{}\"",
            escape_applescript(&notification.message),
            escape_applescript(&notification.app_name),
            escape_applescript(&notification.title),
            notification.severity.sound(),
        )
    }
}

#[async_trait]
impl NotificationSink for AppleScript {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let output = AsyncCommand::new("osascript")
            .arg("-e")
            .arg(Self::script(notification))
            .output()
            .await
            .context("Failed to execute osascript")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("osascript failed: {}", stderr.trim()));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "osascript"
    }
}

/// Windows toast notifications via PowerShell
pub struct WindowsToast;

impl WindowsToast {
    pub fn script(notification: &Notification) -> String {
        let icon = match notification.severity {
            Severity::Success | Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        };

        format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $n = New-Object System.Windows.Forms.NotifyIcon; \
             $n.Icon = [System.Drawing.SystemIcons]::Application; \
             $n.BalloonTipIcon = '{icon}'; \
             $n.BalloonTipTitle = '{title}'; \
             $n.BalloonTipText = '{message}'; \
             $n.Text = '{app}'; \
             $n.Visible = $true; \
             $n.ShowBalloonTip(10000); \
             Start-Sleep -Seconds 5; \
             $n.Dispose()",
            icon = icon,
            title = escape_powershell(&notification.title),
            message = escape_powershell(&notification.message),
            app = escape_powershell(&truncate_chars(&notification.app_name, 63)),
        )
    }
}

#[async_trait]
impl NotificationSink for WindowsToast {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let output = AsyncCommand::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(Self::script(notification))
            .output()
            .await
            .context("Failed to execute powershell")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("powershell notification failed: {}", stderr.trim()));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "powershell"
    }
}

/// Writes notifications to the log only
///
/// Used on platforms without a known mechanism and when notifications are
/// disabled in the configuration.
pub struct LogOnly;

#[async_trait]
impl NotificationSink for LogOnly {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            "[{}] {}: {}",
            notification.severity.as_str(),
            notification.title,
            notification.message
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Best-effort front end over a [`NotificationSink`]
pub struct Notifier {
    app_name: String,
    sink: Box<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(app_name: impl Into<String>, sink: Box<dyn NotificationSink>) -> Self {
        Self {
            app_name: app_name.into(),
            sink,
        }
    }

    /// Pick the sink for the platform this binary was built for
    pub fn for_host(config: &NotificationConfig) -> Self {
        let sink: Box<dyn NotificationSink> = if !config.enabled {
            Box::new(LogOnly)
        } else if cfg!(target_os = "macos") {
            Box::new(AppleScript)
        } else if cfg!(target_os = "windows") {
            Box::new(WindowsToast)
        } else if cfg!(unix) {
            Box::new(NotifySend)
        } else {
            Box::new(LogOnly)
        };

        debug!("Using {} notification sink", sink.name());
        Self::new(config.app_name.clone(), sink)
    }

    /// Send a notification, logging instead of failing when delivery breaks
    pub async fn notify(&self, title: &str, message: &str, severity: Severity) {
        let notification = Notification {
            app_name: self.app_name.clone(),
            title: title.to_string(),
            message: message.to_string(),
            severity,
        };

        match severity {
            Severity::Error => error!("{}: {}", title, message),
            Severity::Warning => warn!("{}: {}", title, message),
            Severity::Success | Severity::Info => debug!("{}: {}", title, message),
        }

        if let Err(e) = self.sink.send(&notification).await {
            warn!("Failed to send {} notification: {:#}", self.sink.name(), e);
        }
    }
}

/// First `max` characters of `text`, respecting char boundaries
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_powershell(text: &str) -> String {
    text.replace('\'', "''")
}

//! User-facing notifications.
//!
//! Screens and helpers never reach for a global toast system. They receive an
//! [`AppContext`] at construction and dispatch through the sink it carries.

use crate::config::NotificationConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Notification severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationLevel {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
    /// Informational
    Info,
    /// Needs attention
    Warning,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        };
        f.write_str(label)
    }
}

/// One toast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Severity
    pub level: NotificationLevel,
    /// Optional heading
    pub title: Option<String>,
    /// Body text
    pub message: String,
    /// How long the toast stays visible
    pub auto_hide: Duration,
}

/// Destination for notifications (a toast system, a log, a test recorder).
pub trait NotificationSink: Send + Sync {
    /// Display or record a notification.
    fn notify(&self, notification: Notification);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, notification: Notification) {
        tracing::trace!(level = %notification.level, "notification dropped");
    }
}

/// Explicit application context handed to stores, clients and helpers.
#[derive(Clone)]
pub struct AppContext {
    notifier: Arc<dyn NotificationSink>,
    config: NotificationConfig,
    hosted: bool,
}

impl AppContext {
    /// Create a context around a notification sink.
    pub fn new(notifier: Arc<dyn NotificationSink>, config: NotificationConfig, hosted: bool) -> Self {
        Self {
            notifier,
            config,
            hosted,
        }
    }

    /// Context whose notifications go nowhere.
    pub fn detached() -> Self {
        Self::new(Arc::new(NullNotifier), NotificationConfig::default(), false)
    }

    /// Running inside the hosted deployment.
    pub fn is_hosted(&self) -> bool {
        self.hosted
    }

    /// Dispatch a notification with the configured auto-hide delay.
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>, title: Option<String>) {
        let auto_hide_ms = if level == NotificationLevel::Error && self.hosted {
            self.config.hosted_error_auto_hide_ms
        } else {
            self.config.auto_hide_ms
        };
        let notification = Notification {
            level,
            title,
            message: message.into(),
            auto_hide: Duration::from_millis(auto_hide_ms),
        };
        tracing::debug!(level = %level, message = %notification.message, "dispatching notification");
        self.notifier.notify(notification);
    }

    /// Success toast.
    pub fn notify_success(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Success, message, None);
    }

    /// Error toast.
    pub fn notify_error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message, None);
    }

    /// Informational toast.
    pub fn notify_info(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, message, None);
    }

    /// Warning toast.
    pub fn notify_warning(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Warning, message, None);
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("hosted", &self.hosted)
            .finish_non_exhaustive()
    }
}

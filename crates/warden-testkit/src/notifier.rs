//! Recording notification sink and session observer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use warden_client::SessionObserver;
use warden_core::{AppContext, Notification, NotificationConfig, NotificationLevel, NotificationSink};

/// Notification sink that keeps everything it is shown.
#[derive(Clone, Debug, Default)]
pub struct MockNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context routing notifications here.
    pub fn context(&self, hosted: bool) -> AppContext {
        AppContext::new(Arc::new(self.clone()), NotificationConfig::default(), hosted)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    /// Messages of error-level notifications.
    pub fn errors(&self) -> Vec<String> {
        self.messages_at(NotificationLevel::Error)
    }

    /// Messages of success-level notifications.
    pub fn successes(&self) -> Vec<String> {
        self.messages_at(NotificationLevel::Success)
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }

    fn messages_at(&self, level: NotificationLevel) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }
}

impl NotificationSink for MockNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

/// Counts session-expiry callbacks.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    expired: AtomicUsize,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn expirations(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }
}

impl SessionObserver for RecordingObserver {
    fn session_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}

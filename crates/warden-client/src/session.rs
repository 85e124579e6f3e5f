//! Session side-channel.
//!
//! The dispatcher records every call here so idle-timeout and telemetry code
//! can see when the console last talked to the server. Session expiry is
//! reported to a [`SessionObserver`] instead of forcing navigation.

use crate::transport::HttpMethod;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

/// The most recent request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastCall {
    /// When it was issued
    pub at: SystemTime,
    /// Verb
    pub method: HttpMethod,
    /// Full URL
    pub url: String,
    /// Analytics event the caller attached
    pub event: Option<String>,
}

/// Shared record of client activity.
#[derive(Debug, Default)]
pub struct SessionInfo {
    last_call: RwLock<Option<LastCall>>,
    expired: AtomicBool,
}

impl SessionInfo {
    /// Empty session record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a request.
    pub fn record(&self, method: HttpMethod, url: &str, event: Option<&str>) {
        *self.last_call.write() = Some(LastCall {
            at: SystemTime::now(),
            method,
            url: url.to_string(),
            event: event.map(str::to_string),
        });
    }

    /// The most recent request.
    pub fn last_call(&self) -> Option<LastCall> {
        self.last_call.read().clone()
    }

    /// Mark the session expired. Returns `true` the first time only.
    pub fn mark_expired(&self) -> bool {
        !self.expired.swap(true, Ordering::AcqRel)
    }

    /// Whether expiry has been observed.
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    /// Clear the expiry flag after the user signs in again.
    pub fn renew(&self) {
        self.expired.store(false, Ordering::Release);
    }
}

/// Receives session expiry, typically to route the user to sign-in.
pub trait SessionObserver: Send + Sync {
    /// The server no longer accepts this session.
    fn session_expired(&self);
}

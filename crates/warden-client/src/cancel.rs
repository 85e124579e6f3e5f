//! In-flight request registry.
//!
//! A request signature is a UUID v5 derived from the normalized path and
//! params, so two calls for the same page of the same list share it. Starting
//! a call aborts any in-flight call with the same signature; at most one
//! logical request per signature is ever outstanding.

use crate::error::{ClientError, ClientResult};
use crate::params::QueryParams;
use futures::future::{AbortHandle, Abortable};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Callback fired after a request is superseded.
pub type CancelCallback = Arc<dyn Fn() + Send + Sync>;

/// Registry of cancellable in-flight requests.
#[derive(Debug, Default)]
pub struct CancelRegistry {
    inflight: Mutex<HashMap<Uuid, (u64, AbortHandle)>>,
    next_ticket: AtomicU64,
}

impl CancelRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic signature of a request.
    pub fn signature(path: &str, params: &QueryParams) -> Uuid {
        let normalized = format!("{}?{}", path.trim_end_matches('/'), params.normalized());
        Uuid::new_v5(&Uuid::NAMESPACE_URL, normalized.as_bytes())
    }

    /// Run `request` as the only outstanding call for `signature`.
    ///
    /// An earlier call with the same signature is aborted and resolves to
    /// [`ClientError::Cancelled`]; its `after_cancel` callback runs one
    /// scheduler tick later.
    pub async fn run<F, T>(
        &self,
        signature: Uuid,
        request: F,
        after_cancel: Option<CancelCallback>,
    ) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (handle, registration) = AbortHandle::new_pair();
        if let Some((_, previous)) = self.inflight.lock().insert(signature, (ticket, handle)) {
            tracing::debug!(%signature, "cancelling superseded request");
            previous.abort();
        }

        let guard = Registration {
            inflight: &self.inflight,
            signature,
            ticket,
        };

        let outcome = Abortable::new(request, registration).await;
        drop(guard);

        match outcome {
            Ok(result) => result,
            Err(_aborted) => {
                if let Some(callback) = after_cancel {
                    tokio::task::yield_now().await;
                    callback();
                }
                Err(ClientError::Cancelled)
            }
        }
    }

    /// Abort the in-flight call for `signature`, if any.
    pub fn cancel(&self, signature: &Uuid) -> bool {
        match self.inflight.lock().remove(signature) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of calls currently registered.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }
}

/// Removes a call's registry entry when the call finishes or its future is
/// dropped. A newer call under the same signature owns the entry and is left
/// alone.
struct Registration<'a> {
    inflight: &'a Mutex<HashMap<Uuid, (u64, AbortHandle)>>,
    signature: Uuid,
    ticket: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        if inflight
            .get(&self.signature)
            .is_some_and(|(ticket, _)| *ticket == self.ticket)
        {
            inflight.remove(&self.signature);
        }
    }
}

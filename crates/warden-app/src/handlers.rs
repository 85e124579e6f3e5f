//! # Response Handlers
//!
//! The terminal consumers of store calls. Screens pass a collection handle
//! and get back closures that settle it:
//!
//! ```rust,ignore
//! handle.before_fetch();
//! match store.fetch_all(&params, &opts, None).await {
//!     Ok(page) => handlers.handle_success(&handle, |_| {})(page),
//!     Err(err) => handlers.handle_error(Some(&handle), ErrorOptions::default(), |_| {})(err),
//! }
//! ```
//!
//! [`ResponseHandlers::load`] does the same in one call.

use crate::templates::{ErrorTemplates, normalize_payload};
use futures_signals::signal::{Mutable, Signal};
use std::future::Future;
use warden_client::{ClientError, CollectionPage};
use warden_core::{AppContext, CollectionHandle};

/// OK-button state of a confirmation modal. Screens disable the button while
/// a request runs; a failed request re-enables it.
#[derive(Clone, Debug)]
pub struct ModalControls {
    ok_enabled: Mutable<bool>,
}

impl ModalControls {
    /// Modal with its OK button enabled.
    pub fn new() -> Self {
        Self {
            ok_enabled: Mutable::new(true),
        }
    }

    /// Disable OK while a request is in flight.
    pub fn disable_ok(&self) {
        self.ok_enabled.set_neq(false);
    }

    /// Enable OK again.
    pub fn enable_ok(&self) {
        self.ok_enabled.set_neq(true);
    }

    /// Whether OK can be pressed.
    pub fn is_ok_enabled(&self) -> bool {
        self.ok_enabled.get()
    }

    /// Signal of the OK button state.
    pub fn ok_enabled_signal(&self) -> impl Signal<Item = bool> + Send + Sync + 'static {
        self.ok_enabled.signal()
    }
}

impl Default for ModalControls {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`ResponseHandlers::handle_error`].
#[derive(Clone, Debug, Default)]
pub struct ErrorOptions {
    /// Modal whose OK button should be re-enabled
    pub modal: Option<ModalControls>,
    /// Toast heading
    pub title: Option<String>,
    /// Do not show a toast
    pub silent: bool,
}

/// Success and error continuations for store calls.
#[derive(Clone, Debug)]
pub struct ResponseHandlers {
    context: AppContext,
    templates: ErrorTemplates,
}

impl ResponseHandlers {
    /// Handlers notifying through `context`.
    pub fn new(context: AppContext, templates: ErrorTemplates) -> Self {
        Self { context, templates }
    }

    /// Notification context.
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Error templates.
    pub fn templates(&self) -> &ErrorTemplates {
        &self.templates
    }

    /// Continuation that settles `handle` with a fetched page and then hands
    /// the page to `callback`.
    pub fn handle_success<M, F>(
        &self,
        handle: &CollectionHandle<M>,
        callback: F,
    ) -> impl FnOnce(CollectionPage<M>)
    where
        M: Clone + Send + Sync + 'static,
        F: FnOnce(&CollectionPage<M>),
    {
        let handle = handle.clone();
        move |page: CollectionPage<M>| {
            handle.reset(page.models.clone(), Some(page.page_state.clone()));
            callback(&page);
        }
    }

    /// Continuation for a failed call.
    ///
    /// Cancelled requests were superseded on purpose and are ignored. Anything
    /// else shows an error toast, leaves `handle` (if given) not loading with
    /// zero pages and the error code set, re-enables the modal's OK button and
    /// finally runs `callback`.
    pub fn handle_error<M, F>(
        &self,
        handle: Option<&CollectionHandle<M>>,
        opts: ErrorOptions,
        callback: F,
    ) -> impl FnOnce(ClientError)
    where
        M: Clone + Send + Sync + 'static,
        F: FnOnce(&ClientError),
    {
        let handle = handle.cloned();
        let context = self.context.clone();
        let templates = self.templates.clone();
        move |err: ClientError| {
            if err.is_cancelled() {
                tracing::debug!("request superseded, not reporting");
                return;
            }

            let message = templates.message_for(&err);
            tracing::warn!(error = %err, code = ?err.error_code(), %message, "request failed");
            if !opts.silent && !err.is_session_expired() {
                context.notify(warden_core::NotificationLevel::Error, message, opts.title);
            }
            if let Some(handle) = handle {
                handle.fail(err.error_code().map(str::to_string));
            }
            if let Some(modal) = &opts.modal {
                modal.enable_ok();
            }
            callback(&err);
        }
    }

    /// Run a collection fetch against `handle`: clear it into the loading
    /// state, await `request`, then settle through the success or error
    /// continuation. Returns the page when the request succeeded.
    pub async fn load<M, Fut>(
        &self,
        handle: &CollectionHandle<M>,
        request: Fut,
    ) -> Option<CollectionPage<M>>
    where
        M: Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<CollectionPage<M>, ClientError>>,
    {
        handle.before_fetch();
        match request.await {
            Ok(page) => {
                let mut delivered = None;
                self.handle_success(handle, |page: &CollectionPage<M>| {
                    delivered = Some(page.clone());
                })(page);
                delivered
            }
            Err(err) => {
                self.handle_error(Some(handle), ErrorOptions::default(), |_| {})(err);
                None
            }
        }
    }

    /// Success toast.
    pub fn notify_success(&self, message: impl Into<String>) {
        self.context.notify_success(message);
    }

    /// Error toast.
    pub fn notify_error(&self, message: impl Into<String>) {
        self.context.notify_error(message);
    }

    /// Informational toast.
    pub fn notify_info(&self, message: impl Into<String>) {
        self.context.notify_info(message);
    }

    /// Warning toast.
    pub fn notify_warning(&self, message: impl Into<String>) {
        self.context.notify_warning(message);
    }
}

/// Decode a payload that may arrive as a JSON string.
pub fn parse_error_payload(err: &ClientError) -> serde_json::Value {
    normalize_payload(err.data())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use warden_core::{Notification, NotificationConfig, NotificationSink, PageState};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl NotificationSink for Recorder {
        fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    fn handlers() -> (Arc<Recorder>, ResponseHandlers) {
        let recorder = Arc::new(Recorder::default());
        let context = AppContext::new(recorder.clone(), NotificationConfig::default(), false);
        (recorder, ResponseHandlers::new(context, ErrorTemplates::new()))
    }

    fn page(models: Vec<Value>, total_pages: u64) -> CollectionPage<Value> {
        CollectionPage {
            models,
            page_state: PageState {
                total_pages,
                ..PageState::default()
            },
            raw: Value::Null,
        }
    }

    #[test]
    fn test_success_resets_handle() {
        let (_, handlers) = handlers();
        let handle = CollectionHandle::<Value>::default();
        handle.before_fetch();

        let mut seen = 0;
        handlers.handle_success(&handle, |p| seen = p.models.len())(page(vec![json!({"id": 1})], 1));

        assert_eq!(seen, 1);
        assert!(!handle.is_loading());
        assert_eq!(handle.page_state().total_pages, 1);
    }

    #[test]
    fn test_error_notifies_and_zeroes_pages() {
        let (recorder, handlers) = handlers();
        let handle = CollectionHandle::<Value>::default();
        handle.reset(vec![], Some(PageState { total_pages: 4, ..PageState::default() }));
        handle.before_fetch();
        let modal = ModalControls::new();
        modal.disable_ok();

        let err = ClientError::status(500, "Request failed with status code 500", Value::Null);
        let opts = ErrorOptions {
            modal: Some(modal.clone()),
            ..ErrorOptions::default()
        };
        handlers.handle_error(Some(&handle), opts, |_| {})(err);

        assert!(!handle.is_loading());
        assert_eq!(handle.page_state().total_pages, 0);
        assert_eq!(handle.error_code().as_deref(), Some("500"));
        assert!(modal.is_ok_enabled());
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cancellation_is_silent() {
        let (recorder, handlers) = handlers();
        let handle = CollectionHandle::<Value>::default();
        handle.before_fetch();

        let mut called = false;
        handlers.handle_error(Some(&handle), ErrorOptions::default(), |_| called = true)(
            ClientError::Cancelled,
        );

        assert!(!called);
        assert!(handle.is_loading());
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_string_payload_is_decoded() {
        let err = ClientError::status(400, "bad", Value::String("{\"msgDesc\":\"x\"}".into()));
        assert_eq!(parse_error_payload(&err), json!({"msgDesc": "x"}));
    }
}

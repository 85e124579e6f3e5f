//! Service wiring from configuration.

use crate::handlers::ResponseHandlers;
use crate::storage::KeyValueStorage;
use crate::templates::ErrorTemplates;
use crate::widths::ColumnWidths;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use warden_client::{EntityStore, HttpTransport, RemoteClient, SessionObserver};
use warden_core::{AppContext, NotificationSink, Record, WardenConfig, WardenError};

/// Load configuration: the TOML file when given (defaults otherwise), then
/// `WARDEN_*` environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<WardenConfig, WardenError> {
    let mut config = match path {
        Some(path) => WardenConfig::load_from_file(path)?,
        None => WardenConfig::default(),
    };
    config.merge_with_env()?;
    config.validate()?;
    Ok(config)
}

/// Everything a screen needs, built once at startup.
#[derive(Clone)]
pub struct Services {
    /// Effective configuration
    pub config: Arc<WardenConfig>,
    /// Shared HTTP client
    pub client: Arc<RemoteClient>,
    /// Success/error continuations
    pub handlers: ResponseHandlers,
    /// Column width persistence
    pub widths: Arc<ColumnWidths>,
}

impl Services {
    /// Wire services around a transport and notification sink.
    pub fn new(
        config: WardenConfig,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn NotificationSink>,
        templates: ErrorTemplates,
    ) -> Self {
        let context = AppContext::new(notifier, config.notifications.clone(), config.client.hosted);
        let client = Arc::new(RemoteClient::from_config(&config, transport, context.clone()));
        Self {
            config: Arc::new(config),
            client,
            handlers: ResponseHandlers::new(context, templates),
            widths: Arc::new(ColumnWidths::in_memory()),
        }
    }

    /// Same as [`Services::new`] with a session-expiry observer.
    pub fn with_observer(
        config: WardenConfig,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn NotificationSink>,
        templates: ErrorTemplates,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let context = AppContext::new(notifier, config.notifications.clone(), config.client.hosted);
        let client = RemoteClient::from_config(&config, transport, context.clone())
            .with_observer(observer);
        Self {
            config: Arc::new(config),
            client: Arc::new(client),
            handlers: ResponseHandlers::new(context, templates),
            widths: Arc::new(ColumnWidths::in_memory()),
        }
    }

    /// Persist column widths through `storage`.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.widths = Arc::new(ColumnWidths::new(storage));
        self
    }

    /// Store for a REST resource, sharing this client.
    pub fn store<M: Record + DeserializeOwned>(&self, base_url: &str) -> EntityStore<M> {
        EntityStore::new(self.client.clone(), base_url)
    }

    /// Notification context.
    pub fn context(&self) -> &AppContext {
        self.handlers.context()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

//! Warden Core - Shared Foundation for the Console Data-Binding Layer
//!
//! This crate holds the types every other Warden crate agrees on. It has no
//! I/O of its own: stores, forms and tables depend on it, never the reverse.
//!
//! # Modules
//!
//! - [`errors`]: the unified [`WardenError`] type
//! - [`config`]: layered configuration (TOML file, then environment, then validation)
//! - [`record`]: primary keys and the [`Record`] trait stores inject by
//! - [`page`]: normalized pagination metadata ([`PageState`])
//! - [`collection`]: the observable [`CollectionHandle`] UI components watch
//! - [`notify`]: notification sink and the explicit [`AppContext`]
//! - [`logging`]: `tracing` subscriber installation

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Layered configuration
pub mod config;

/// Tracing subscriber setup
pub mod logging;

/// Record identity
pub mod record;

/// Pagination metadata
pub mod page;

/// Observable remote-collection state
pub mod collection;

/// User-facing notifications
pub mod notify;

pub use collection::{CollectionHandle, CollectionOptions, CollectionState, Settlement};
pub use config::{
    CacheConfig, ClientConfig, FormsConfig, NotificationConfig, WardenConfig,
};
pub use errors::{Result, WardenError};
pub use notify::{AppContext, Notification, NotificationLevel, NotificationSink, NullNotifier};
pub use page::{PageState, PaginationStrategy, SortDirection, SortSpec};
pub use record::{Record, RecordKey};

//! Warden Client - REST Access for the Console
//!
//! This crate is the only place the console talks HTTP.
//!
//! # Modules
//!
//! - [`transport`]: the [`HttpTransport`] seam and its reqwest implementation
//! - [`client`]: [`RemoteClient`], the single request dispatcher
//! - [`cache`]: bounded LRU + TTL [`ResponseCache`]
//! - [`session`]: last-call record and session-expiry observer
//! - [`store`]: [`EntityStore`], one repository per REST resource
//! - [`pagination`]: page-state derivation from list envelopes
//! - [`cancel`]: in-flight request de-duplication
//! - [`params`]: caller-owned [`QueryParams`]
//! - [`error`]: [`ClientError`]

#![forbid(unsafe_code)]

pub mod cache;
pub mod cancel;
pub mod client;
pub mod error;
pub mod pagination;
pub mod params;
pub mod session;
pub mod store;
pub mod transport;

pub use cache::ResponseCache;
pub use cancel::{CancelCallback, CancelRegistry};
pub use client::{ApiResponse, HttpHooks, NoHooks, RemoteClient, RequestOptions};
pub use error::{ClientError, ClientResult};
pub use params::QueryParams;
pub use session::{LastCall, SessionInfo, SessionObserver};
pub use store::{
    BaseUrl, CollectionPage, EntityStore, Fetched, InjectReport, RawOutput, RecordMapper,
    StoreOptions,
};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

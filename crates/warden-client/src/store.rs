//! # Entity Store
//!
//! A repository bound to one REST resource. It owns a local cache of the
//! records it has seen, keyed by primary key, and merges every response into
//! that cache ("injection") before handing records back.
//!
//! ## Injection
//!
//! Responses are boxed into a sequence (a single object becomes one item),
//! mapped to records, and written into the cache under one batched mutation so
//! observers never see a half-merged cache. The returned records are read back
//! from the cache in response order, so a created record comes back as the
//! record the server returned and lists keep the server's ordering.
//!
//! Collection fetches replace the cache with the fetched page. Single-record
//! calls merge by key.
//!
//! ## Sub-collections
//!
//! A store has exactly one record mapper. Nested resources with a different
//! shape get their own store via [`EntityStore::sub_store`].

use crate::cancel::{CancelCallback, CancelRegistry};
use crate::client::{ApiResponse, RemoteClient, RequestOptions};
use crate::error::{ClientError, ClientResult};
use crate::pagination::{is_envelope, items_of, to_page_state};
use crate::params::{encode_component, QueryParams};
use crate::transport::HttpMethod;
use futures_signals::signal::{Mutable, Signal};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use warden_core::{CollectionHandle, PageState, PaginationStrategy, Record, RecordKey};

/// Turns one wire item into a record.
pub type RecordMapper<M> = Arc<dyn Fn(Value) -> ClientResult<M> + Send + Sync>;

/// Maps a domain payload to its wire form before POST/PUT.
pub type PayloadTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Replaces the default (identity) response deserialization.
pub type Deserializer = Arc<dyn Fn(Value) -> ClientResult<Value> + Send + Sync>;

/// Where a store's URLs start.
#[derive(Clone)]
pub enum BaseUrl {
    /// Fixed path
    Static(String),
    /// Resolved per request (for paths that depend on the current scope)
    Computed(Arc<dyn Fn() -> Option<String> + Send + Sync>),
}

impl BaseUrl {
    fn resolve(&self) -> Option<String> {
        match self {
            Self::Static(url) => Some(url.clone()),
            Self::Computed(compute) => compute(),
        }
        .filter(|url| !url.trim().is_empty())
    }
}

impl fmt::Debug for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(url) => f.debug_tuple("Static").field(url).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Options for one store call.
#[derive(Clone, Default)]
pub struct StoreOptions {
    /// Extra path segment between the base URL and the id
    pub path: Option<String>,
    /// Skip the local cache on `fetch`
    pub no_cache: bool,
    /// Return records together with the body and response
    pub raw: bool,
    /// Return the untouched response, skipping injection
    pub raw_response: bool,
    /// Map the payload before POST/PUT
    pub transform_payload: Option<PayloadTransform>,
    /// Replace response deserialization
    pub deserialize: Option<Deserializer>,
    /// Cancel an in-flight call with the same path and params
    pub add_cancel_token: bool,
    /// Runs after this call is cancelled by a newer one
    pub after_cancel: Option<CancelCallback>,
    /// Options passed to the HTTP layer
    pub request: RequestOptions,
}

impl StoreOptions {
    /// Bypass the local cache.
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Request the raw output.
    #[must_use]
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Request the untouched response.
    #[must_use]
    pub fn raw_response(mut self) -> Self {
        self.raw_response = true;
        self
    }

    /// Add a path segment.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// De-duplicate against in-flight calls, optionally with a callback.
    #[must_use]
    pub fn cancellable(mut self, after_cancel: Option<CancelCallback>) -> Self {
        self.add_cancel_token = true;
        self.after_cancel = after_cancel;
        self
    }

    /// Map payloads before sending.
    #[must_use]
    pub fn transform_payload(
        mut self,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transform_payload = Some(Arc::new(transform));
        self
    }

    /// Custom deserialization.
    #[must_use]
    pub fn deserialize(
        mut self,
        deserialize: impl Fn(Value) -> ClientResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.deserialize = Some(Arc::new(deserialize));
        self
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("path", &self.path)
            .field("no_cache", &self.no_cache)
            .field("raw", &self.raw)
            .field("raw_response", &self.raw_response)
            .field("add_cancel_token", &self.add_cancel_token)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Records plus the body they came from (`raw` option).
#[derive(Clone, Debug, PartialEq)]
pub struct RawOutput<M> {
    /// Injected records in response order
    pub models: Vec<M>,
    /// Deserialized body
    pub raw: Value,
    /// Copy of the original response
    pub raw_response: ApiResponse,
}

/// What a store call resolved to.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched<M> {
    /// The response was a single record
    One(M),
    /// The response was a sequence or envelope
    Many(Vec<M>),
    /// `raw` was requested
    Raw(RawOutput<M>),
    /// `raw_response` was requested
    Response(ApiResponse),
}

impl<M> Fetched<M> {
    /// The records, whatever the shape.
    pub fn into_models(self) -> Vec<M> {
        match self {
            Self::One(model) => vec![model],
            Self::Many(models) => models,
            Self::Raw(raw) => raw.models,
            Self::Response(_) => Vec::new(),
        }
    }

    /// The first record.
    pub fn into_one(self) -> Option<M> {
        self.into_models().into_iter().next()
    }
}

/// One page of a collection fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionPage<M> {
    /// Records in server order
    pub models: Vec<M>,
    /// Derived pagination metadata
    pub page_state: PageState,
    /// Deserialized envelope
    pub raw: Value,
}

/// Keys touched by one injection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InjectReport {
    /// Keys not previously cached
    pub inserted: Vec<RecordKey>,
    /// Keys that replaced a cached record
    pub updated: Vec<RecordKey>,
    /// Records without a key (returned but not cached)
    pub unkeyed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InjectMode {
    Merge,
    Replace,
}

enum Slot<M> {
    Cached(RecordKey),
    Loose(M),
}

/// Repository for one REST resource.
pub struct EntityStore<M: Record> {
    client: Arc<RemoteClient>,
    base_url: Option<BaseUrl>,
    mapper: RecordMapper<M>,
    strategy: PaginationStrategy,
    synthetic_ids: bool,
    next_synthetic: AtomicI64,
    cache: Mutable<IndexMap<RecordKey, M>>,
    cancels: CancelRegistry,
}

impl<M: Record + DeserializeOwned> EntityStore<M> {
    /// Store for `base_url`, mapping items with serde.
    pub fn new(client: Arc<RemoteClient>, base_url: impl Into<String>) -> Self {
        Self::with_mapper(
            client,
            Some(BaseUrl::Static(base_url.into())),
            Arc::new(serde_mapper::<M>),
        )
    }
}

fn serde_mapper<M: DeserializeOwned>(item: Value) -> ClientResult<M> {
    serde_json::from_value(item).map_err(ClientError::from)
}

impl<M: Record> EntityStore<M> {
    /// Store with an explicit record mapper.
    pub fn with_mapper(
        client: Arc<RemoteClient>,
        base_url: Option<BaseUrl>,
        mapper: RecordMapper<M>,
    ) -> Self {
        Self {
            client,
            base_url,
            mapper,
            strategy: PaginationStrategy::default(),
            synthetic_ids: false,
            next_synthetic: AtomicI64::new(1),
            cache: Mutable::new(IndexMap::new()),
            cancels: CancelRegistry::new(),
        }
    }

    /// Resolve the base URL per request.
    #[must_use]
    pub fn computed_base_url(
        mut self,
        compute: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.base_url = Some(BaseUrl::Computed(Arc::new(compute)));
        self
    }

    /// How the backend numbers pages.
    #[must_use]
    pub fn strategy(mut self, strategy: PaginationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Give keyless records sequential ids so they can be cached.
    #[must_use]
    pub fn synthetic_ids(mut self, enabled: bool) -> Self {
        self.synthetic_ids = enabled;
        self
    }

    /// A store for a nested resource under this one.
    pub fn sub_store<N: Record>(&self, path: &str, mapper: RecordMapper<N>) -> EntityStore<N> {
        let parent = self.base_url.clone();
        let path = path.to_string();
        let base = BaseUrl::Computed(Arc::new(move || {
            let parent = parent.as_ref()?.resolve()?;
            Some(join_path(&[parent.as_str(), path.as_str()]))
        }));
        EntityStore::with_mapper(self.client.clone(), Some(base), mapper).strategy(self.strategy)
    }

    /// The HTTP client.
    pub fn client(&self) -> &Arc<RemoteClient> {
        &self.client
    }

    // ─── URLs ────────────────────────────────────────────────

    /// `base[/path][/id]`, with the id encoded and duplicate slashes collapsed.
    pub fn make_url(&self, id: Option<&RecordKey>, opts: &StoreOptions) -> ClientResult<String> {
        let base = self
            .base_url
            .as_ref()
            .and_then(BaseUrl::resolve)
            .ok_or(ClientError::MissingBaseUrl)?;

        let mut parts = vec![base];
        if let Some(path) = opts.path.as_deref().filter(|p| !p.is_empty()) {
            parts.push(path.to_string());
        }
        if let Some(id) = id {
            parts.push(encode_component(&id.to_string()));
        }
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        Ok(join_path(&refs))
    }

    // ─── Remote operations ───────────────────────────────────

    /// POST a new record.
    pub async fn create(&self, data: Value, opts: &StoreOptions) -> ClientResult<Fetched<M>> {
        let url = self.make_url(None, opts)?;
        let payload = transform(opts, data);
        let response = self
            .send(HttpMethod::Post, &url, Some(payload), &QueryParams::new(), opts)
            .await?;
        self.finish(response, opts, InjectMode::Merge)
    }

    /// PUT a record.
    pub async fn update(
        &self,
        id: &RecordKey,
        data: Value,
        opts: &StoreOptions,
    ) -> ClientResult<Fetched<M>> {
        let url = self.make_url(Some(id), opts)?;
        let payload = transform(opts, data);
        let response = self
            .send(HttpMethod::Put, &url, Some(payload), &QueryParams::new(), opts)
            .await?;
        self.finish(response, opts, InjectMode::Merge)
    }

    /// Read one record, from the local cache unless `no_cache` (or a raw
    /// output) is requested.
    pub async fn fetch(&self, id: &RecordKey, opts: &StoreOptions) -> ClientResult<Fetched<M>> {
        if !(opts.no_cache || opts.raw || opts.raw_response) {
            if let Some(model) = self.get(id) {
                tracing::trace!(%id, "store cache hit");
                return Ok(Fetched::One(model));
            }
        }
        let url = self.make_url(Some(id), opts)?;
        let response = self
            .send(HttpMethod::Get, &url, None, &QueryParams::new(), opts)
            .await?;
        self.finish(response, opts, InjectMode::Merge)
    }

    /// Read one page of the collection (or of a nested list under `id`).
    pub async fn fetch_all(
        &self,
        query: &QueryParams,
        opts: &StoreOptions,
        id: Option<&RecordKey>,
    ) -> ClientResult<CollectionPage<M>> {
        let url = self.make_url(id, opts)?;
        let response = self.send(HttpMethod::Get, &url, None, query, opts).await?;

        let body = deserialize(opts, response.data)?;
        let (report, models) = self.inject(items_of(&body), InjectMode::Replace)?;
        tracing::debug!(
            %url,
            inserted = report.inserted.len(),
            updated = report.updated.len(),
            "collection fetched"
        );

        let page_state = to_page_state(&body, self.strategy, models.len());
        Ok(CollectionPage {
            models,
            page_state,
            raw: body,
        })
    }

    /// DELETE a record and drop it locally, from this store's cache and from
    /// `models` when given, without waiting for a re-fetch.
    pub async fn delete(
        &self,
        id: &RecordKey,
        opts: &StoreOptions,
        data: Option<Value>,
        models: Option<&CollectionHandle<M>>,
    ) -> ClientResult<ApiResponse> {
        let url = self.make_url(Some(id), opts)?;
        let response = self
            .send(HttpMethod::Delete, &url, data, &QueryParams::new(), opts)
            .await?;

        self.remove_local(id);
        if let Some(handle) = models {
            handle.remove_by_key(id);
        }
        Ok(response)
    }

    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        data: Option<Value>,
        params: &QueryParams,
        opts: &StoreOptions,
    ) -> ClientResult<ApiResponse> {
        let request = self.client.dispatch(method, url, data, params, &opts.request);
        if !opts.add_cancel_token {
            return request.await;
        }
        let signature = CancelRegistry::signature(url, params);
        self.cancels
            .run(signature, request, opts.after_cancel.clone())
            .await
    }

    // ─── Injection ───────────────────────────────────────────

    fn finish(
        &self,
        response: ApiResponse,
        opts: &StoreOptions,
        mode: InjectMode,
    ) -> ClientResult<Fetched<M>> {
        if opts.raw_response {
            return Ok(Fetched::Response(response));
        }
        self.after(response, opts, mode)
    }

    fn after(
        &self,
        response: ApiResponse,
        opts: &StoreOptions,
        mode: InjectMode,
    ) -> ClientResult<Fetched<M>> {
        let body = deserialize(opts, response.data.clone())?;
        let sequence = body.is_array() || is_envelope(&body);
        let (_, models) = self.inject(items_of(&body), mode)?;

        if opts.raw {
            return Ok(Fetched::Raw(RawOutput {
                models,
                raw: body,
                raw_response: response,
            }));
        }
        if sequence || models.len() != 1 {
            return Ok(Fetched::Many(models));
        }
        Ok(models
            .into_iter()
            .next()
            .map_or_else(|| Fetched::Many(Vec::new()), Fetched::One))
    }

    fn inject(&self, items: Vec<Value>, mode: InjectMode) -> ClientResult<(InjectReport, Vec<M>)> {
        let mut mapped = Vec::with_capacity(items.len());
        for item in items {
            mapped.push((self.mapper)(item)?);
        }

        let mut report = InjectReport::default();
        let mut cache = self.cache.lock_mut();
        let previous = match mode {
            InjectMode::Replace => std::mem::take(&mut *cache),
            InjectMode::Merge => IndexMap::new(),
        };

        let mut slots = Vec::with_capacity(mapped.len());
        for mut model in mapped {
            if model.key().is_none() && self.synthetic_ids {
                model.assign_key(self.next_synthetic_key(&cache, &previous));
            }
            match model.key() {
                Some(key) => {
                    let existed = cache.insert(key.clone(), model).is_some()
                        || previous.contains_key(&key);
                    if existed {
                        report.updated.push(key.clone());
                    } else {
                        report.inserted.push(key.clone());
                    }
                    slots.push(Slot::Cached(key));
                }
                None => {
                    report.unkeyed += 1;
                    slots.push(Slot::Loose(model));
                }
            }
        }

        let models = slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Cached(key) => cache.get(&key).cloned(),
                Slot::Loose(model) => Some(model),
            })
            .collect();
        drop(cache);

        if report.unkeyed > 0 {
            tracing::debug!(unkeyed = report.unkeyed, "records without a key were not cached");
        }
        Ok((report, models))
    }

    /// Merge already-decoded items into the cache, as a response would.
    pub fn inject_values(&self, items: Vec<Value>) -> ClientResult<InjectReport> {
        self.inject(items, InjectMode::Merge).map(|(report, _)| report)
    }

    fn next_synthetic_key(
        &self,
        cache: &IndexMap<RecordKey, M>,
        previous: &IndexMap<RecordKey, M>,
    ) -> RecordKey {
        loop {
            let key = RecordKey::Int(self.next_synthetic.fetch_add(1, Ordering::Relaxed));
            if !cache.contains_key(&key) && !previous.contains_key(&key) {
                return key;
            }
        }
    }

    // ─── Local cache ─────────────────────────────────────────

    /// Cached record.
    pub fn get(&self, id: &RecordKey) -> Option<M> {
        self.cache.lock_ref().get(id).cloned()
    }

    /// Cached records in cache order.
    pub fn all(&self) -> Vec<M> {
        self.cache.lock_ref().values().cloned().collect()
    }

    /// Cached records matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&M) -> bool) -> Vec<M> {
        self.cache
            .lock_ref()
            .values()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.cache.lock_ref().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Optimistically write a record. Returns its key, or `None` when it has none.
    pub fn upsert_local(&self, model: M) -> Option<RecordKey> {
        let key = model.key()?;
        self.cache.lock_mut().insert(key.clone(), model);
        Some(key)
    }

    /// Drop a record from the cache.
    pub fn remove_local(&self, id: &RecordKey) -> Option<M> {
        self.cache.lock_mut().shift_remove(id)
    }

    /// Drop every cached record.
    pub fn clear(&self) {
        self.cache.lock_mut().clear();
    }

    /// Signal of the cached records.
    pub fn models_signal(&self) -> impl Signal<Item = Vec<M>> + Send + Sync + 'static {
        self.cache.signal_ref(|cache| cache.values().cloned().collect())
    }
}

impl<M: Record> fmt::Debug for EntityStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("base_url", &self.base_url)
            .field("strategy", &self.strategy)
            .field("cached", &self.len())
            .finish_non_exhaustive()
    }
}

fn transform(opts: &StoreOptions, data: Value) -> Value {
    match &opts.transform_payload {
        Some(transform) => transform(data),
        None => data,
    }
}

fn deserialize(opts: &StoreOptions, body: Value) -> ClientResult<Value> {
    match &opts.deserialize {
        Some(deserialize) => deserialize(body),
        None => Ok(body),
    }
}

/// Join URL segments with single slashes, leaving a scheme's `//` intact.
pub fn join_path(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");

    let (scheme, rest) = match joined.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, joined.as_str()),
    };

    let mut collapsed = String::with_capacity(rest.len());
    for ch in rest.chars() {
        if ch == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(ch);
    }

    match scheme {
        Some(scheme) => format!("{scheme}://{collapsed}"),
        None => collapsed,
    }
}

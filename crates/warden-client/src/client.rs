//! # Remote Client
//!
//! Every request the console makes goes through [`RemoteClient::dispatch`]:
//!
//! 1. relative URLs are joined onto `url_root`
//! 2. `resource`/`resources` params are pre-encoded unless hosted
//! 3. opted-in GETs are answered from the bounded [`ResponseCache`]
//! 4. the call is recorded in [`SessionInfo`]
//! 5. the transport runs, bracketed by the [`HttpHooks`]
//! 6. the answer is normalized: 2xx succeeds, a login redirect or code 777
//!    expires the session, anything else becomes a [`ClientError::Status`]

use crate::cache::ResponseCache;
use crate::error::{ClientError, ClientResult, SESSION_EXPIRED_CODE};
use crate::params::QueryParams;
use crate::session::{SessionInfo, SessionObserver};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use warden_core::{AppContext, ClientConfig, WardenConfig};

/// Message shown when the server stops accepting the session.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Per-request options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// Answer from (and fill) the response cache; GET only
    pub cache: bool,
    /// Overrides the configured timeout
    pub timeout: Option<Duration>,
    /// Analytics event recorded with the call
    pub analytics_event: Option<String>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    /// Options with caching enabled.
    pub fn cached() -> Self {
        Self {
            cache: true,
            ..Self::default()
        }
    }
}

/// A successful, normalized response.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    /// HTTP status (200 for cache hits)
    pub status: u16,
    /// Final URL
    pub url: String,
    /// Response headers (empty for cache hits)
    pub headers: Vec<(String, String)>,
    /// Parsed body; `Null` when empty, a JSON string when not JSON
    pub data: Value,
    /// Served from the response cache
    pub from_cache: bool,
}

/// Request shaping and response post-processing around the transport.
pub trait HttpHooks: Send + Sync {
    /// Adjust a request before it is sent.
    fn before_http(&self, _request: &mut HttpRequest) {}

    /// Adjust a successful response before it is cached and returned.
    fn after_http(&self, _response: &mut ApiResponse) {}
}

/// Hooks that change nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl HttpHooks for NoHooks {}

/// HTTP client bound to one server root.
pub struct RemoteClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    cache: ResponseCache,
    session: Arc<SessionInfo>,
    observer: Option<Arc<dyn SessionObserver>>,
    hooks: Arc<dyn HttpHooks>,
    context: AppContext,
}

impl RemoteClient {
    /// Client with a default cache and a detached context.
    pub fn new(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            cache: ResponseCache::default(),
            session: Arc::new(SessionInfo::new()),
            observer: None,
            hooks: Arc::new(NoHooks),
            context: AppContext::detached(),
        }
    }

    /// Client wired from the full configuration.
    pub fn from_config(
        config: &WardenConfig,
        transport: Arc<dyn HttpTransport>,
        context: AppContext,
    ) -> Self {
        Self::new(config.client.clone(), transport)
            .with_cache(ResponseCache::from_config(&config.cache))
            .with_context(context)
    }

    /// Replace the response cache.
    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    /// Share a session record with other components.
    #[must_use]
    pub fn with_session(mut self, session: Arc<SessionInfo>) -> Self {
        self.session = session;
        self
    }

    /// Observe session expiry.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Install request/response hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn HttpHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Use a notification context.
    #[must_use]
    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = context;
        self
    }

    /// Client settings.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Session record.
    pub fn session(&self) -> &Arc<SessionInfo> {
        &self.session
    }

    /// Notification context.
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    // ─── Verbs ───────────────────────────────────────────────

    /// GET `url`.
    pub async fn get(
        &self,
        url: &str,
        params: &QueryParams,
        opts: &RequestOptions,
    ) -> ClientResult<ApiResponse> {
        self.dispatch(HttpMethod::Get, url, None, params, opts).await
    }

    /// PUT `data` to `url`.
    pub async fn put(
        &self,
        url: &str,
        data: Option<Value>,
        params: &QueryParams,
        opts: &RequestOptions,
    ) -> ClientResult<ApiResponse> {
        self.dispatch(HttpMethod::Put, url, data, params, opts).await
    }

    /// POST `data` to `url`.
    pub async fn post(
        &self,
        url: &str,
        data: Option<Value>,
        params: &QueryParams,
        opts: &RequestOptions,
    ) -> ClientResult<ApiResponse> {
        self.dispatch(HttpMethod::Post, url, data, params, opts).await
    }

    /// DELETE `url`, optionally with a body.
    pub async fn del(
        &self,
        url: &str,
        data: Option<Value>,
        params: &QueryParams,
        opts: &RequestOptions,
    ) -> ClientResult<ApiResponse> {
        self.dispatch(HttpMethod::Delete, url, data, params, opts).await
    }

    // ─── Dispatcher ──────────────────────────────────────────

    /// Single path every verb funnels through.
    pub async fn dispatch(
        &self,
        method: HttpMethod,
        url: &str,
        data: Option<Value>,
        params: &QueryParams,
        opts: &RequestOptions,
    ) -> ClientResult<ApiResponse> {
        let url = self.absolute_url(url);

        let cache_key = (opts.cache && method == HttpMethod::Get)
            .then(|| ResponseCache::key(method.as_str(), &url, &params.normalized()));
        if let Some(key) = &cache_key {
            if let Some(data) = self.cache.get(key) {
                tracing::debug!(%method, %url, "response cache hit");
                return Ok(ApiResponse {
                    status: 200,
                    url,
                    headers: Vec::new(),
                    data,
                    from_cache: true,
                });
            }
        }

        self.session
            .record(method, &url, opts.analytics_event.as_deref());

        let mut request = HttpRequest {
            method,
            url: url.clone(),
            query: params.wire_pairs(self.config.hosted),
            headers: self.default_headers(),
            body: data,
            timeout: opts.timeout.or_else(|| self.config.timeout()),
        };
        request.headers.extend(opts.headers.iter().cloned());
        self.hooks.before_http(&mut request);

        if self.config.debug_mode {
            tracing::debug!(%method, url = %request.full_url(), body = ?request.body, "dispatching request");
        } else {
            tracing::trace!(%method, %url, "dispatching request");
        }

        let response = self.transport.send(request).await.map_err(|err| {
            tracing::warn!(%method, %url, error = %err, "request failed");
            err
        })?;

        if is_login_redirect(&response) {
            return Err(self.expire_session());
        }

        let data = parse_body(&response.body);
        if !response.is_success() {
            let message = error_message(&data).unwrap_or_else(|| {
                format!("Request failed with status code {}", response.status)
            });
            if message.contains(SESSION_EXPIRED_CODE) {
                return Err(self.expire_session());
            }
            tracing::warn!(%method, %url, status = response.status, %message, "request rejected");
            return Err(ClientError::status(response.status, message, data));
        }

        let mut api = ApiResponse {
            status: response.status,
            url: if response.url.is_empty() { url.clone() } else { response.url },
            headers: response.headers,
            data,
            from_cache: false,
        };
        self.hooks.after_http(&mut api);

        if let Some(key) = cache_key {
            self.cache.insert(key, api.data.clone());
        }
        if method.is_write() {
            let dropped = self.cache.invalidate_prefix(&url);
            if dropped > 0 {
                tracing::debug!(%url, dropped, "invalidated cached responses");
            }
        }
        Ok(api)
    }

    /// Join a relative URL onto `url_root`.
    pub fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let root = self.config.url_root.trim_end_matches('/');
        if root.is_empty() || url.starts_with(&format!("{root}/")) {
            return url.to_string();
        }
        format!("{root}/{}", url.trim_start_matches('/'))
    }

    fn default_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if let Some(token) = &self.config.csrf_token {
            headers.push(("X-CSRF-TOKEN".to_string(), token.clone()));
        }
        headers
    }

    fn expire_session(&self) -> ClientError {
        if self.session.mark_expired() {
            tracing::warn!("session expired");
            self.context.notify_error(SESSION_EXPIRED_MESSAGE);
            if let Some(observer) = &self.observer {
                observer.session_expired();
            }
        }
        ClientError::SessionExpired
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Whether the server bounced the request to its sign-in page.
fn is_login_redirect(response: &HttpResponse) -> bool {
    let to_login = |target: &str| {
        let path = target.split(['?', '#']).next().unwrap_or_default();
        path.ends_with("/login") || path.contains("/login/")
    };
    if response.is_redirect() {
        return response.header("location").is_some_and(to_login);
    }
    to_login(&response.url)
}

/// Body text as JSON: empty is `Null`, anything unparsable is a JSON string.
pub fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Message a structured error body carries (`msgDesc`, `message`, `error`).
pub fn error_message(data: &Value) -> Option<String> {
    match data {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => ["msgDesc", "message", "error"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

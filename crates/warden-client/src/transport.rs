//! HTTP transport seam.
//!
//! The dispatcher in [`crate::client`] only speaks [`HttpRequest`] and
//! [`HttpResponse`]. [`ReqwestTransport`] is the production implementation;
//! tests plug in a scripted transport instead.

use crate::error::ClientError;
use crate::params::render;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use warden_core::ClientConfig;

/// HTTP verb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Upper-case verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the verb changes server state.
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    /// Verb
    pub method: HttpMethod,
    /// Absolute or root-relative URL without query string
    pub url: String,
    /// Query pairs, not yet encoded
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Request without query, headers or body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// URL with the encoded query string appended.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = render(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.url)
    }

    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// One received response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status
    pub status: u16,
    /// Final URL after any redirects
    pub url: String,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Raw body text
    pub body: String,
}

impl HttpResponse {
    /// Response with a status and JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            ..Self::default()
        }
    }

    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Whether the status is in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is a redirect.
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Something that can carry an [`HttpRequest`] to a server.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request. Any answer from the server, whatever its status, is
    /// `Ok`; only failures to get an answer are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
///
/// reqwest only sends absolute URLs. Root-relative request URLs (an empty or
/// path-only `url_root`) are resolved against the transport's base.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base: Option<Url>,
}

impl ReqwestTransport {
    /// Transport with reqwest's default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport around a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client, base: None }
    }

    /// Resolve relative request URLs against `base`.
    #[must_use]
    pub fn with_base(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Transport whose base is the configured `client.origin`, if any.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = Self::new();
        match config.origin.as_deref() {
            Some(origin) => {
                let base = Url::parse(origin).map_err(|e| {
                    ClientError::transport(format!("invalid client.origin {origin}: {e}"))
                })?;
                Ok(transport.with_base(base))
            }
            None => Ok(transport),
        }
    }

    /// Absolute URL for `url`.
    pub fn resolve(&self, url: &str) -> Result<Url, ClientError> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }
        let Some(base) = &self.base else {
            return Err(ClientError::transport(format!(
                "{url} is relative and the transport has no base URL (set client.origin)"
            )));
        };
        base.join(url)
            .map_err(|e| ClientError::transport(format!("cannot resolve {url} against {base}: {e}")))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let url = self.resolve(&request.url)?;
        let mut builder = self.client.request(method, url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            ClientError::transport(format!("{} {} failed: {e}", request.method, request.url))
        })?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url() {
        let mut request = HttpRequest::new(HttpMethod::Get, "/api/policies");
        assert_eq!(request.full_url(), "/api/policies");
        request.query = vec![("q".into(), "a b".into()), ("page".into(), "1".into())];
        assert_eq!(request.full_url(), "/api/policies?q=a%20b&page=1");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = HttpResponse {
            headers: vec![("Location".into(), "/login".into())],
            ..HttpResponse::default()
        };
        assert_eq!(response.header("location"), Some("/login"));
    }

    #[test]
    fn test_relative_urls_resolve_against_base() {
        let base = Url::parse("https://console.example.com").unwrap();
        let transport = ReqwestTransport::new().with_base(base);

        let url = transport.resolve("/service/api/policies").unwrap();
        assert_eq!(url.as_str(), "https://console.example.com/service/api/policies");

        let url = transport.resolve("https://other.example.com/api/x").unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/api/x");
    }

    #[test]
    fn test_from_config_uses_origin() {
        let mut config = ClientConfig::default();
        assert!(ReqwestTransport::from_config(&config).unwrap().base.is_none());

        config.origin = Some("https://console.example.com".to_string());
        let transport = ReqwestTransport::from_config(&config).unwrap();
        assert_eq!(
            transport.resolve("/api/policies").unwrap().as_str(),
            "https://console.example.com/api/policies"
        );

        config.origin = Some("not a url".to_string());
        assert!(ReqwestTransport::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_root_relative_request_without_base_fails_cleanly() {
        let transport = ReqwestTransport::new();
        let err = transport
            .send(HttpRequest::new(HttpMethod::Get, "/api/policies"))
            .await
            .unwrap_err();
        match err {
            ClientError::Transport { message } => assert!(message.contains("client.origin")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_classes() {
        assert!(HttpResponse::json(204, &Value::Null).is_success());
        assert!(!HttpResponse::json(300, &Value::Null).is_success());
        assert!(HttpResponse::json(302, &Value::Null).is_redirect());
    }
}

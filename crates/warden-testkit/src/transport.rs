//! Scripted HTTP transport.
//!
//! Replies are queued per `(method, path)`. Each call consumes the front of
//! the queue except the last reply, which keeps answering. Unscripted routes
//! answer 404 with a JSON message so a missing script fails loudly.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warden_client::{ClientError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};

#[derive(Clone, Debug)]
enum Reply {
    Respond(HttpResponse),
    Fail(ClientError),
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<(HttpMethod, String), VecDeque<Reply>>,
    calls: Vec<HttpRequest>,
    latency: Option<Duration>,
}

/// Transport answering from a script.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().unwrap().latency = Some(latency);
        self
    }

    /// Queue a JSON reply.
    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> &Self {
        self.push(method, path, Reply::Respond(HttpResponse::json(status, &body)))
    }

    /// Queue a fully specified response.
    pub fn respond_with(&self, method: HttpMethod, path: &str, response: HttpResponse) -> &Self {
        self.push(method, path, Reply::Respond(response))
    }

    /// Queue a transport failure.
    pub fn fail(&self, method: HttpMethod, path: &str, error: ClientError) -> &Self {
        self.push(method, path, Reply::Fail(error))
    }

    /// Queue a 302 to the login page.
    pub fn redirect_to_login(&self, method: HttpMethod, path: &str) -> &Self {
        self.respond_with(
            method,
            path,
            HttpResponse {
                status: 302,
                headers: vec![("Location".to_string(), "/console/login".to_string())],
                ..HttpResponse::default()
            },
        )
    }

    /// Every request received, in order.
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of requests received for a route.
    pub fn calls_to(&self, method: HttpMethod, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.method == method && path_of(&call.url) == path)
            .count()
    }

    /// Most recent request.
    pub fn last_call(&self) -> Option<HttpRequest> {
        self.state.lock().unwrap().calls.last().cloned()
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) -> &Self {
        self.state
            .lock()
            .unwrap()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    fn next_reply(&self, request: &HttpRequest) -> (Option<Reply>, Option<Duration>) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());
        let latency = state.latency;
        let key = (request.method, path_of(&request.url).to_string());
        let reply = state.routes.get_mut(&key).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });
        (reply, latency)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let (reply, latency) = self.next_reply(&request);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match reply {
            Some(Reply::Respond(mut response)) => {
                if response.url.is_empty() {
                    response.url = request.url.clone();
                }
                Ok(response)
            }
            Some(Reply::Fail(error)) => Err(error),
            None => {
                tracing::debug!(method = %request.method, url = %request.url, "unscripted request");
                let mut response = HttpResponse::json(
                    404,
                    &json!({ "message": format!("No route for {} {}", request.method, request.url) }),
                );
                response.url = request.url;
                Ok(response)
            }
        }
    }
}

/// Path part of an absolute or relative URL.
fn path_of(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => {
            let after = &url[idx + 3..];
            after.find('/').map_or("/", |slash| &after[slash..])
        }
        None => url,
    };
    rest.split(['?', '#']).next().unwrap_or(rest)
}

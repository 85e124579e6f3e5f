//! Request dispatcher behaviour against a scripted transport.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use warden_client::client::SESSION_EXPIRED_MESSAGE;
use warden_client::{ClientError, HttpMethod, QueryParams, RemoteClient, RequestOptions};
use warden_testkit::{test_client, test_config, MockNotifier, MockTransport, RecordingObserver};

#[tokio::test]
async fn dispatch_joins_root_and_sends_default_headers() {
    let transport = MockTransport::new();
    transport.respond(HttpMethod::Get, "/api/policies", 200, json!([]));
    let (client, _) = test_client(&transport);

    let params = QueryParams::new().with("q", "web");
    client
        .get("/policies", &params, &RequestOptions::default())
        .await
        .unwrap();

    let call = transport.last_call().unwrap();
    assert_eq!(call.url, "https://console.test/api/policies");
    assert_eq!(call.full_url(), "https://console.test/api/policies?q=web");
    assert_eq!(call.header("x-requested-with"), Some("XMLHttpRequest"));
    assert_eq!(call.header("content-type"), Some("application/json"));
    assert_eq!(call.header("X-CSRF-TOKEN"), Some("csrf-token"));
    assert_eq!(call.timeout, Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn request_options_override_timeout_and_add_headers() {
    let transport = MockTransport::new();
    transport.respond(HttpMethod::Post, "/api/policies", 201, json!({"id": 1}));
    let (client, _) = test_client(&transport);

    let opts = RequestOptions {
        timeout: Some(Duration::from_millis(250)),
        headers: vec![("X-Trace".to_string(), "abc".to_string())],
        analytics_event: Some("policy.create".to_string()),
        ..RequestOptions::default()
    };
    let response = client
        .post("/policies", Some(json!({"name": "a"})), &QueryParams::new(), &opts)
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    let call = transport.last_call().unwrap();
    assert_eq!(call.timeout, Some(Duration::from_millis(250)));
    assert_eq!(call.header("x-trace"), Some("abc"));
    assert_eq!(call.body, Some(json!({"name": "a"})));

    let last = client.session().last_call().unwrap();
    assert_eq!(last.method, HttpMethod::Post);
    assert_eq!(last.event.as_deref(), Some("policy.create"));
}

#[tokio::test(start_paused = true)]
async fn cached_get_is_served_until_a_write() {
    let transport = MockTransport::new();
    transport
        .respond(HttpMethod::Get, "/api/policies", 200, json!([{"id": 1}]))
        .respond(HttpMethod::Post, "/api/policies", 201, json!({"id": 2}));
    let (client, _) = test_client(&transport);
    let params = QueryParams::new().with("page", 1);

    let first = client.get("/policies", &params, &RequestOptions::cached()).await.unwrap();
    let second = client.get("/policies", &params, &RequestOptions::cached()).await.unwrap();
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.data, first.data);
    assert_eq!(transport.calls_to(HttpMethod::Get, "/api/policies"), 1);

    client
        .post("/policies", Some(json!({})), &QueryParams::new(), &RequestOptions::default())
        .await
        .unwrap();
    let third = client.get("/policies", &params, &RequestOptions::cached()).await.unwrap();
    assert!(!third.from_cache);
    assert_eq!(transport.calls_to(HttpMethod::Get, "/api/policies"), 2);
}

#[tokio::test(start_paused = true)]
async fn cached_entries_expire_after_ttl() {
    let transport = MockTransport::new();
    transport.respond(HttpMethod::Get, "/api/policies", 200, json!([]));
    let (client, _) = test_client(&transport);
    let params = QueryParams::new();

    client.get("/policies", &params, &RequestOptions::cached()).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    let again = client.get("/policies", &params, &RequestOptions::cached()).await.unwrap();

    assert!(!again.from_cache);
    assert_eq!(transport.calls_to(HttpMethod::Get, "/api/policies"), 2);
}

#[tokio::test]
async fn server_error_carries_message_and_code() {
    let transport = MockTransport::new();
    transport
        .respond(
            HttpMethod::Put,
            "/api/policies/3",
            409,
            json!({"msgDesc": "Name already taken", "errorCode": "POL-7"}),
        )
        .respond(HttpMethod::Get, "/api/broken", 500, Value::Null);
    let (client, _) = test_client(&transport);

    let err = client
        .put("/policies/3", Some(json!({})), &QueryParams::new(), &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), Some(409));
    assert_eq!(err.error_code(), Some("POL-7"));
    assert_eq!(err.to_string(), "Name already taken");

    let err = client
        .get("/broken", &QueryParams::new(), &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some("500"));
    assert!(err.to_string().contains("status code 500"));
}

#[tokio::test]
async fn session_expiry_is_reported_once() {
    let transport = MockTransport::new();
    transport
        .respond(HttpMethod::Get, "/api/policies", 401, json!({"message": "Error 777"}))
        .redirect_to_login(HttpMethod::Get, "/api/users");
    let notifier = MockNotifier::new();
    let observer = RecordingObserver::new();
    let client = RemoteClient::from_config(
        &test_config(),
        Arc::new(transport.clone()),
        notifier.context(false),
    )
    .with_observer(observer.clone());

    let first = client
        .get("/policies", &QueryParams::new(), &RequestOptions::default())
        .await
        .unwrap_err();
    let second = client
        .get("/users", &QueryParams::new(), &RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(first, ClientError::SessionExpired);
    assert_eq!(second, ClientError::SessionExpired);
    assert_eq!(observer.expirations(), 1);
    assert_eq!(notifier.errors(), vec![SESSION_EXPIRED_MESSAGE.to_string()]);
    assert!(client.session().is_expired());

    client.session().renew();
    client
        .get("/policies", &QueryParams::new(), &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(observer.expirations(), 2);
}

#[tokio::test]
async fn resource_params_are_encoded_unless_hosted() {
    let transport = MockTransport::new();
    transport.respond(HttpMethod::Get, "/api/audit", 200, json!([]));
    let (client, _) = test_client(&transport);
    let params = QueryParams::new().with("resource", "files/a b");

    client.get("/audit", &params, &RequestOptions::default()).await.unwrap();
    let standalone = transport.last_call().unwrap().query;
    assert_ne!(standalone[0].1, "files/a b");

    let mut config = test_config();
    config.client.hosted = true;
    let (hosted, _) = warden_testkit::client_with(config, &transport);
    hosted.get("/audit", &params, &RequestOptions::default()).await.unwrap();
    assert_eq!(transport.last_call().unwrap().query[0].1, "files/a b");
}

#[tokio::test]
async fn transport_failures_propagate() {
    let transport = MockTransport::new();
    transport.fail(HttpMethod::Get, "/api/policies", ClientError::transport("connection reset"));
    let (client, notifier) = test_client(&transport);

    let err = client
        .get("/policies", &QueryParams::new(), &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::transport("connection reset"));
    assert!(notifier.notifications().is_empty());
}

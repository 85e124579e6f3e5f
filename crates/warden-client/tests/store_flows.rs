//! Entity store flows over the dispatcher.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warden_client::{ClientError, EntityStore, Fetched, HttpMethod, QueryParams, StoreOptions};
use warden_core::{CollectionHandle, PaginationStrategy, RecordKey};
use warden_testkit::{numbered_page, policies, policy, ranged_page, test_client, MockTransport, Policy};

fn store(transport: &MockTransport) -> EntityStore<Policy> {
    let (client, _) = test_client(transport);
    EntityStore::new(client, "/policies")
}

#[tokio::test]
async fn fetch_all_derives_page_state_from_ranged_envelope() {
    let transport = MockTransport::new();
    transport.respond(
        HttpMethod::Get,
        "/api/policies",
        200,
        ranged_page(policies(20), 95, 20, 20),
    );
    let store = store(&transport).strategy(PaginationStrategy::Ranged);

    let page = store
        .fetch_all(&QueryParams::new().with("startIndex", 20), &StoreOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(page.models.len(), 20);
    assert_eq!(page.page_state.total_pages, 5);
    assert_eq!(page.page_state.number, Some(1));
    assert_eq!(store.len(), 20);
}

#[tokio::test]
async fn fetch_all_replaces_previous_page() {
    let transport = MockTransport::new();
    transport
        .respond(HttpMethod::Get, "/api/policies", 200, numbered_page(policies(3), 5, 2, 0))
        .respond(
            HttpMethod::Get,
            "/api/policies",
            200,
            numbered_page(vec![policy(4, "d"), policy(5, "e")], 5, 2, 1),
        );
    let store = store(&transport);

    store.fetch_all(&QueryParams::new(), &StoreOptions::default(), None).await.unwrap();
    let second = store
        .fetch_all(&QueryParams::new().with("page", 1), &StoreOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(second.page_state.number, Some(1));
    let ids: Vec<_> = store.all().into_iter().filter_map(|p| p.id).collect();
    assert_eq!(ids, vec![4, 5]);
}

#[tokio::test]
async fn created_record_is_injected() {
    let transport = MockTransport::new();
    transport.respond(HttpMethod::Post, "/api/policies", 201, policy(42, "audit"));
    let store = store(&transport);

    let created = store
        .create(json!({"name": "audit"}), &StoreOptions::default())
        .await
        .unwrap()
        .into_one()
        .unwrap();

    assert_eq!(created.id, Some(42));
    assert_eq!(store.get(&RecordKey::Int(42)), Some(created));
    assert_eq!(transport.last_call().unwrap().body, Some(json!({"name": "audit"})));
}

#[tokio::test]
async fn fetch_reads_local_cache_unless_told_otherwise() {
    let transport = MockTransport::new();
    transport
        .respond(HttpMethod::Get, "/api/policies", 200, json!([policy(1, "a")]))
        .respond(HttpMethod::Get, "/api/policies/1", 200, policy(1, "renamed"));
    let store = store(&transport);
    store.fetch_all(&QueryParams::new(), &StoreOptions::default(), None).await.unwrap();

    let cached = store.fetch(&RecordKey::Int(1), &StoreOptions::default()).await.unwrap();
    assert_eq!(cached.into_one().map(|p| p.name), Some("a".to_string()));
    assert_eq!(transport.calls_to(HttpMethod::Get, "/api/policies/1"), 0);

    let fresh = store
        .fetch(&RecordKey::Int(1), &StoreOptions::default().no_cache())
        .await
        .unwrap();
    assert_eq!(fresh.into_one().map(|p| p.name), Some("renamed".to_string()));
    assert_eq!(store.get(&RecordKey::Int(1)).map(|p| p.name), Some("renamed".to_string()));
}

#[tokio::test]
async fn delete_removes_from_store_and_handle() {
    let transport = MockTransport::new();
    transport
        .respond(HttpMethod::Get, "/api/policies", 200, json!(policies(3)))
        .respond(HttpMethod::Delete, "/api/policies/2", 204, Value::Null);
    let store = store(&transport);
    let handle = CollectionHandle::<Policy>::default();

    let page = store.fetch_all(&QueryParams::new(), &StoreOptions::default(), None).await.unwrap();
    handle.reset(page.models, Some(page.page_state));

    store
        .delete(&RecordKey::Int(2), &StoreOptions::default(), None, Some(&handle))
        .await
        .unwrap();

    let remaining = |models: Vec<Policy>| models.into_iter().filter_map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(remaining(store.all()), vec![1, 3]);
    assert_eq!(remaining(handle.models()), vec![1, 3]);
}

#[tokio::test]
async fn failed_delete_keeps_local_state() {
    let transport = MockTransport::new();
    transport
        .respond(HttpMethod::Get, "/api/policies", 200, json!(policies(2)))
        .respond(HttpMethod::Delete, "/api/policies/1", 403, json!({"message": "Forbidden"}));
    let store = store(&transport);
    store.fetch_all(&QueryParams::new(), &StoreOptions::default(), None).await.unwrap();

    let err = store
        .delete(&RecordKey::Int(1), &StoreOptions::default(), None, None)
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), Some(403));
    assert_eq!(store.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn newer_identical_request_cancels_older() {
    let transport = MockTransport::new().with_latency(Duration::from_millis(100));
    transport.respond(HttpMethod::Get, "/api/policies", 200, json!(policies(2)));
    let store = store(&transport);

    let cancelled = Arc::new(AtomicUsize::new(0));
    let counter = cancelled.clone();
    let opts = StoreOptions::default().cancellable(Some(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })));
    let params = QueryParams::new().with("q", "web");

    let (older, newer) = tokio::join!(
        store.fetch_all(&params, &opts, None),
        store.fetch_all(&params, &opts, None),
    );

    assert_eq!(older.unwrap_err(), ClientError::Cancelled);
    assert_eq!(newer.unwrap().models.len(), 2);
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn different_params_do_not_cancel() {
    let transport = MockTransport::new().with_latency(Duration::from_millis(100));
    transport.respond(HttpMethod::Get, "/api/policies", 200, json!(policies(1)));
    let store = store(&transport);
    let opts = StoreOptions::default().cancellable(None);

    let params_a = QueryParams::new().with("page", 0);
    let params_b = QueryParams::new().with("page", 1);
    let (a, b) = tokio::join!(
        store.fetch_all(&params_a, &opts, None),
        store.fetch_all(&params_b, &opts, None),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
}

#[tokio::test]
async fn raw_response_skips_injection() {
    let transport = MockTransport::new();
    transport.respond(HttpMethod::Get, "/api/policies/7", 200, policy(7, "raw"));
    let store = store(&transport);

    let fetched = store
        .fetch(&RecordKey::Int(7), &StoreOptions::default().raw_response())
        .await
        .unwrap();

    match fetched {
        Fetched::Response(response) => assert_eq!(response.data["name"], json!("raw")),
        other => panic!("expected a raw response, got {other:?}"),
    }
    assert!(store.is_empty());
}

//! Record fixtures and pre-wired clients.

use crate::notifier::MockNotifier;
use crate::transport::MockTransport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use warden_app::TableRow;
use warden_client::RemoteClient;
use warden_core::{Record, RecordKey, WardenConfig};

/// A typed record used across tests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Record for Policy {
    fn key(&self) -> Option<RecordKey> {
        self.id.map(RecordKey::Int)
    }

    fn assign_key(&mut self, key: RecordKey) {
        if let RecordKey::Int(id) = key {
            self.id = Some(id);
        }
    }
}

impl TableRow for Policy {
    fn cell(&self, field: &str) -> Value {
        match field {
            "id" => self.id.map_or(Value::Null, Value::from),
            "name" => Value::String(self.name.clone()),
            "enabled" => Value::Bool(self.enabled),
            _ => Value::Null,
        }
    }
}

/// Policy JSON.
pub fn policy(id: i64, name: &str) -> Value {
    json!({ "id": id, "name": name, "enabled": true })
}

/// Policies with ids `1..=count`, named `policy-N`.
pub fn policies(count: i64) -> Vec<Value> {
    (1..=count).map(|id| policy(id, &format!("policy-{id}"))).collect()
}

/// Envelope in the ranged shape (`totalCount`, `startIndex`, ...).
pub fn ranged_page(content: Vec<Value>, total_count: u64, page_size: u64, start_index: u64) -> Value {
    let result_size = content.len();
    json!({
        "content": content,
        "totalCount": total_count,
        "pageSize": page_size,
        "startIndex": start_index,
        "resultSize": result_size,
    })
}

/// Envelope in the numbered shape (`totalElements`, `totalPages`, ...).
pub fn numbered_page(content: Vec<Value>, total_elements: u64, total_pages: u64, number: u64) -> Value {
    let size = content.len();
    json!({
        "content": content,
        "totalElements": total_elements,
        "totalPages": total_pages,
        "number": number,
        "size": size,
        "first": number == 0,
        "last": number + 1 >= total_pages,
    })
}

/// Configuration pointing at a fake host with a CSRF token.
pub fn test_config() -> WardenConfig {
    let mut config = WardenConfig::default();
    config.client.url_root = "https://console.test/api".to_string();
    config.client.csrf_token = Some("csrf-token".to_string());
    config
}

/// Client on [`test_config`] notifying into a fresh [`MockNotifier`].
pub fn test_client(transport: &MockTransport) -> (Arc<RemoteClient>, MockNotifier) {
    client_with(test_config(), transport)
}

/// Client on `config` notifying into a fresh [`MockNotifier`].
pub fn client_with(config: WardenConfig, transport: &MockTransport) -> (Arc<RemoteClient>, MockNotifier) {
    let notifier = MockNotifier::new();
    let context = notifier.context(config.client.hosted);
    let client = RemoteClient::from_config(&config, Arc::new(transport.clone()), context);
    (Arc::new(client), notifier)
}

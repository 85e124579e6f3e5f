//! Page-state derivation from list envelopes.
//!
//! Two envelope shapes are understood:
//!
//! - page-numbered: `{content, totalElements, totalPages, size, number, ...}`
//! - ranged: `{content, totalCount, pageSize, startIndex, resultSize, sortBy, sortType}`
//!
//! A bare array is a single page holding everything.

use serde_json::Value;
use warden_core::{PageState, PaginationStrategy, SortDirection, SortSpec};

/// Records carried by a response body.
pub fn items_of(body: &Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("content") {
            Some(Value::Array(items)) => items.clone(),
            Some(_) | None if is_envelope(body) => Vec::new(),
            _ => vec![body.clone()],
        },
        _ => Vec::new(),
    }
}

/// Whether a body is a list envelope rather than a single record.
pub fn is_envelope(body: &Value) -> bool {
    body.get("content").is_some_and(Value::is_array)
        || body.get("totalCount").is_some()
        || body.get("totalElements").is_some()
}

/// Derive page metadata for `count` records returned in `body`.
pub fn to_page_state(body: &Value, strategy: PaginationStrategy, count: usize) -> PageState {
    let count = count as u64;
    let mut state = if body.get("totalCount").is_some() {
        ranged_envelope(body, count)
    } else if is_envelope(body) {
        numbered_envelope(body, count)
    } else {
        PageState {
            total_elements: count,
            total_pages: u64::from(count > 0),
            number_of_elements: count,
            size: count,
            ..PageState::default()
        }
    };

    if strategy == PaginationStrategy::Ranged {
        let number = if state.size == 0 {
            0
        } else {
            state.start_index / state.size
        };
        state.number = Some(number);
        state.first = Some(number == 0);
        state.last = Some(number.saturating_add(1) >= state.total_pages);
    }
    state
}

fn ranged_envelope(body: &Value, count: u64) -> PageState {
    let total = number(body, "totalCount").unwrap_or(count);
    let size = number(body, "pageSize").unwrap_or(count);
    let sort = body
        .get("sortBy")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|field| SortSpec {
            field: field.to_string(),
            direction: body
                .get("sortType")
                .and_then(Value::as_str)
                .and_then(SortDirection::parse)
                .unwrap_or_default(),
        });

    PageState {
        total_elements: total,
        total_pages: PageState::total_pages_for(total, size),
        number_of_elements: number(body, "resultSize").unwrap_or(count),
        size,
        start_index: number(body, "startIndex").unwrap_or(0),
        sort,
        ..PageState::default()
    }
}

fn numbered_envelope(body: &Value, count: u64) -> PageState {
    let total = number(body, "totalElements").unwrap_or(count);
    let size = number(body, "size").unwrap_or(count);
    let page = number(body, "number");

    PageState {
        total_elements: total,
        total_pages: number(body, "totalPages")
            .unwrap_or_else(|| PageState::total_pages_for(total, size)),
        number_of_elements: number(body, "numberOfElements").unwrap_or(count),
        size,
        start_index: page.map_or(0, |p| p.saturating_mul(size)),
        sort: None,
        number: page,
        first: body.get("first").and_then(Value::as_bool),
        last: body.get("last").and_then(Value::as_bool),
    }
}

/// Non-negative integer field, accepting numeric strings.
fn number(body: &Value, key: &str) -> Option<u64> {
    match body.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

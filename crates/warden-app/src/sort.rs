//! Client-side single-column sorting.

use serde_json::Value;
use std::cmp::Ordering;
use warden_core::{SortDirection, SortSpec};

/// Next sort after a header click: the same column flips direction, a
/// different column starts ascending.
pub fn next_sort(current: Option<&SortSpec>, clicked: &str) -> SortSpec {
    let direction = match current {
        Some(spec) if spec.field == clicked => spec.direction.toggled(),
        _ => SortDirection::Asc,
    };
    SortSpec {
        field: clicked.to_string(),
        direction,
    }
}

/// Order two cell values: nulls first, then booleans, numbers, text
/// (case-insensitive) and finally everything else by its JSON text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x
            .to_lowercase()
            .cmp(&y.to_lowercase())
            .then_with(|| x.cmp(y)),
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Stable sort by a derived key.
///
/// Each item is paired with its original index and ties on the key fall back
/// to that index, so equal rows keep their relative order in both directions.
pub fn stable_sort<M, F>(items: Vec<M>, key: F, direction: SortDirection) -> Vec<M>
where
    F: Fn(&M) -> Value,
{
    let mut decorated: Vec<(usize, Value, M)> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| (index, key(&item), item))
        .collect();

    decorated.sort_unstable_by(|(ia, ka, _), (ib, kb, _)| {
        let by_key = compare_values(ka, kb);
        let by_key = match direction {
            SortDirection::Asc => by_key,
            SortDirection::Desc => by_key.reverse(),
        };
        by_key.then(ia.cmp(ib))
    });

    decorated.into_iter().map(|(_, _, item)| item).collect()
}

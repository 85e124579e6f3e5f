//! Persisted column widths.
//!
//! Widths live under one storage key as a JSON object mapping table id to a
//! `;`-separated list of pixel widths: `{"policies": "120;80;240"}`. When the
//! storage is missing or fails, an in-memory copy keeps the current session
//! working.

use crate::storage::KeyValueStorage;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Storage key holding every table's widths.
pub const COLUMN_WIDTHS_KEY: &str = "columnResizeTableData";

/// Column width persistence for all tables.
pub struct ColumnWidths {
    storage: Option<Arc<dyn KeyValueStorage>>,
    fallback: Mutex<Map<String, Value>>,
}

impl ColumnWidths {
    /// Persist through `storage`.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage: Some(storage),
            fallback: Mutex::new(Map::new()),
        }
    }

    /// Keep widths in memory only.
    pub fn in_memory() -> Self {
        Self {
            storage: None,
            fallback: Mutex::new(Map::new()),
        }
    }

    /// Widths saved for `table_id`.
    pub fn load(&self, table_id: &str) -> Option<Vec<u32>> {
        let blob = self.read_blob();
        let encoded = blob.get(table_id)?.as_str()?;
        parse_widths(encoded)
    }

    /// Save widths for `table_id`.
    pub fn save(&self, table_id: &str, widths: &[u32]) {
        let mut blob = self.read_blob();
        blob.insert(table_id.to_string(), Value::String(format_widths(widths)));
        self.write_blob(blob);
    }

    /// Forget the widths of `table_id`.
    pub fn clear(&self, table_id: &str) {
        let mut blob = self.read_blob();
        if blob.remove(table_id).is_some() {
            self.write_blob(blob);
        }
    }

    fn read_blob(&self) -> Map<String, Value> {
        if let Some(storage) = &self.storage {
            match storage.get_item(COLUMN_WIDTHS_KEY) {
                Ok(Some(text)) => {
                    if let Ok(Value::Object(map)) = serde_json::from_str(&text) {
                        return map;
                    }
                    tracing::warn!("discarding malformed column width data");
                    return Map::new();
                }
                Ok(None) => return Map::new(),
                Err(err) => {
                    tracing::debug!(error = %err, "column width storage unavailable, using memory");
                }
            }
        }
        self.fallback.lock().clone()
    }

    fn write_blob(&self, blob: Map<String, Value>) {
        if let Some(storage) = &self.storage {
            let text = Value::Object(blob.clone()).to_string();
            match storage.set_item(COLUMN_WIDTHS_KEY, text) {
                Ok(()) => return,
                Err(err) => {
                    tracing::debug!(error = %err, "column width storage unavailable, using memory");
                }
            }
        }
        *self.fallback.lock() = blob;
    }
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for ColumnWidths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnWidths")
            .field("persistent", &self.storage.is_some())
            .finish_non_exhaustive()
    }
}

/// `"120;80"` from `[120, 80]`.
pub fn format_widths(widths: &[u32]) -> String {
    widths
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// Parse `"120;80"`; `None` if any entry is not a width.
pub fn parse_widths(encoded: &str) -> Option<Vec<u32>> {
    if encoded.trim().is_empty() {
        return Some(Vec::new());
    }
    encoded
        .split(';')
        .map(|w| w.trim().trim_end_matches("px").parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_encoding() {
        assert_eq!(format_widths(&[120, 80, 240]), "120;80;240");
        assert_eq!(parse_widths("120;80px; 240"), Some(vec![120, 80, 240]));
        assert_eq!(parse_widths("120;wide"), None);
        assert_eq!(parse_widths(""), Some(vec![]));
    }

    #[test]
    fn test_in_memory_round_trip() {
        let widths = ColumnWidths::in_memory();
        assert_eq!(widths.load("policies"), None);
        widths.save("policies", &[100, 200]);
        widths.save("users", &[50]);
        assert_eq!(widths.load("policies"), Some(vec![100, 200]));

        widths.clear("policies");
        assert_eq!(widths.load("policies"), None);
        assert_eq!(widths.load("users"), Some(vec![50]));
    }
}

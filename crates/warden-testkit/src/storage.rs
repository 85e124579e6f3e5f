//! In-memory key-value storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use warden_app::KeyValueStorage;
use warden_core::WardenError;

/// Storage backed by a map. Can be switched off to simulate a browser with
/// storage disabled.
#[derive(Debug)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    available: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Storage whose every operation fails.
    pub fn unavailable() -> Self {
        let storage = Self::new();
        storage.set_available(false);
        storage
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Raw stored value, bypassing the availability switch.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.lock().unwrap().get(key).cloned()
    }

    fn check(&self) -> Result<(), WardenError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(WardenError::internal("storage unavailable"))
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, WardenError> {
        self.check()?;
        Ok(self.items.lock().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), WardenError> {
        self.check()?;
        self.items.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), WardenError> {
        self.check()?;
        self.items.lock().unwrap().remove(key);
        Ok(())
    }
}

//! Session-scoped key/value storage for UI state.

use warden_core::WardenError;

/// Browser-session style storage. Implementations may be unavailable (for
/// example in privacy modes) and report that as an error.
pub trait KeyValueStorage: Send + Sync {
    /// Stored value.
    fn get_item(&self, key: &str) -> Result<Option<String>, WardenError>;

    /// Store a value.
    fn set_item(&self, key: &str, value: String) -> Result<(), WardenError>;

    /// Remove a value.
    fn remove_item(&self, key: &str) -> Result<(), WardenError>;
}

//! Storage trait for persisted probe settings.
//!
//! The store is a flat string key/value map. Implementations must be
//! thread-safe (`Send + Sync`) since the admin server shares one instance
//! across request handlers.

/// Key/value settings storage.
pub trait SettingsStore: Send + Sync {
    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Remove `key`, returning its previous value.
    fn delete(&self, key: &str) -> Option<String>;

    /// Store `value` only if `key` is absent. Returns whether it was stored.
    fn set_if_absent(&self, key: &str, value: String) -> bool {
        if self.get(key).is_some() {
            return false;
        }
        self.set(key, value);
        true
    }
}

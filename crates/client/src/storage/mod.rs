//! Durable local key-value storage.
//!
//! The stores persist through this abstraction instead of touching the
//! filesystem directly, which keeps them unit-testable and lets embedders
//! supply their own backend. The contract is deliberately small and
//! synchronous: origin-scoped string slots that survive process restarts
//! (for the file backend).
//!
//! Local failures never propagate: a malformed stored value is treated as
//! absence (logged, then the empty default wins), and write failures are
//! logged and swallowed.

mod file;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use file::FileStore;

/// Stable names of the persisted slots.
///
/// Each key is written by exactly one store and must stay stable for the
/// lifetime of a deployed client.
pub mod keys {
    /// Opaque auth token issued by the login/register endpoints.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// JSON snapshot of the authenticated user.
    pub const AUTH_USER: &str = "auth_user";

    /// JSON array of serialized cart lines.
    pub const CART: &str = "cart";
}

/// Synchronous durable string storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);

    /// Delete the value stored under `key`, if present.
    fn remove(&self, key: &str);
}

/// Read and deserialize a JSON value, treating malformed data as absence.
///
/// A parse failure is logged and recovered; it never reaches the caller.
pub(crate) fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, %error, "discarding malformed persisted value");
            None
        }
    }
}

/// Serialize and store a JSON value.
pub(crate) fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(error) => {
            tracing::warn!(key, %error, "failed to serialize value for persistence");
        }
    }
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("missing").is_none());

        store.set(keys::AUTH_TOKEN, "tok-123");
        assert_eq!(store.get(keys::AUTH_TOKEN).as_deref(), Some("tok-123"));

        store.set(keys::AUTH_TOKEN, "tok-456");
        assert_eq!(store.get(keys::AUTH_TOKEN).as_deref(), Some("tok-456"));

        store.remove(keys::AUTH_TOKEN);
        assert!(store.get(keys::AUTH_TOKEN).is_none());
    }

    #[test]
    fn test_read_json_malformed_is_absence() {
        let store = MemoryStore::new();
        store.set(keys::CART, "not json {");
        let read: Option<Vec<String>> = read_json(&store, keys::CART);
        assert!(read.is_none());
    }

    #[test]
    fn test_write_then_read_json() {
        let store = MemoryStore::new();
        write_json(&store, keys::CART, &vec!["a".to_string(), "b".to_string()]);
        let read: Option<Vec<String>> = read_json(&store, keys::CART);
        assert_eq!(read.unwrap(), vec!["a", "b"]);
    }
}

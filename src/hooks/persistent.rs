//! State backed by origin storage
//!
//! [`PersistentState`] is an in-memory value with a synchronous persistence
//! sink. Reads consult storage once, at construction, falling back to the
//! supplied initial value; every write updates memory first and then makes a
//! best-effort attempt to persist. Storage failures are logged and never
//! reach the caller, so the in-memory value stays authoritative for the
//! session.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::platform::Storage;

/// A value persisted as JSON under a storage key
pub struct PersistentState<T> {
    key: String,
    value: T,
    storage: Option<Arc<dyn Storage>>,
}

impl<T: fmt::Debug> fmt::Debug for PersistentState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentState")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("persisted", &self.storage.is_some())
            .finish()
    }
}

impl<T> PersistentState<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Loads the value stored under `key`, or starts from `initial`
    ///
    /// The resulting value is written back immediately. Without storage no
    /// I/O happens and the state holds `initial`.
    pub fn new(key: impl Into<String>, initial: T, storage: Option<Arc<dyn Storage>>) -> Self {
        let key = key.into();
        let value = match &storage {
            Some(storage) => load(storage.as_ref(), &key).unwrap_or(initial),
            None => initial,
        };

        let state = Self {
            key,
            value,
            storage,
        };
        state.persist();
        state
    }

    /// Returns the current value
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Returns the storage key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replaces the value and persists it
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.persist();
    }

    /// Modifies the value in place and persists it
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.persist();
    }

    /// Consumes the state, returning the value
    pub fn into_inner(self) -> T {
        self.value
    }

    fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let json = match serde_json::to_string(&self.value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to serialize persistent state");
                return;
            }
        };

        if let Err(e) = storage.set_item(&self.key, &json) {
            tracing::warn!(key = %self.key, error = %e, "Failed to write persistent state");
        }
    }
}

/// Reads and parses the stored value, logging anything unusable
fn load<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to read persistent state");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Stored value is not valid JSON, using initial value");
            None
        }
    }
}

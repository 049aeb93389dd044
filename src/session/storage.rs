//! Durable key-value storage for settings and usage statistics.
//!
//! Storage is best effort: every failure is logged and the caller falls
//! back to defaults.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

pub const SETTINGS_KEY: &str = "ambience_settings";
pub const USAGE_KEY: &str = "ambience_usage";

/// String-keyed storage backend (browser `localStorage`, a file, memory).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process store, used natively and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn try_load<T: DeserializeOwned>(
    store: &impl KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Load the JSON record under `key`; missing or unreadable → `T::default()`.
pub fn load_json<T: DeserializeOwned + Default>(store: &impl KeyValueStore, key: &str) -> T {
    match try_load(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Ignoring stored '{key}': {e}");
            T::default()
        }
    }
}

/// Store `value` as JSON under `key`, logging (and ignoring) failures.
pub fn save_json<T: Serialize>(store: &mut impl KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|json| store.set(key, &json));
    if let Err(e) = result {
        log::warn!("Could not save '{key}': {e}");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::Deserialize;

    /// Backend that refuses every operation (private browsing, quota).
    #[derive(Debug, Default)]
    pub(crate) struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("denied".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Record {
        level: u32,
    }

    #[test]
    fn round_trips_through_memory() {
        let mut store = MemoryStore::new();
        save_json(&mut store, "k", &Record { level: 7 });
        assert_eq!(store.get("k").unwrap().as_deref(), Some(r#"{"level":7}"#));
        assert_eq!(load_json::<Record>(&store, "k"), Record { level: 7 });
    }

    #[test]
    fn missing_key_gives_default() {
        let store = MemoryStore::new();
        assert_eq!(load_json::<Record>(&store, "absent"), Record::default());
    }

    #[test]
    fn malformed_value_gives_default() {
        let mut store = MemoryStore::new();
        store.set("k", "{not json").unwrap();
        assert_eq!(load_json::<Record>(&store, "k"), Record::default());
    }

    #[test]
    fn backend_failures_are_ignored() {
        let mut store = BrokenStore;
        save_json(&mut store, "k", &Record { level: 1 });
        assert_eq!(load_json::<Record>(&store, "k"), Record::default());
    }
}

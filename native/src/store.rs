//! In-process key-value table.
//! Keys are non-empty UTF-8 strings, values are opaque bytes. The table is a
//! sharded concurrent map: every read and write holds its shard's lock, so
//! readers see either the old value or the new one, never a mix, and keys in
//! different shards do not contend.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::NativeError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Shard count; must be a power of two greater than one. `None` lets the
    /// map pick one from the CPU count.
    pub shards: Option<usize>,
    pub initial_capacity: usize,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), NativeError> {
        match self.shards {
            Some(shards) if shards <= 1 || !shards.is_power_of_two() => Err(NativeError::invalid(
                "shards must be a power of two greater than one",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct KvStore {
    entries: DashMap<String, Vec<u8>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &StoreConfig) -> Result<Self, NativeError> {
        config.validate()?;
        let entries = match config.shards {
            Some(shards) => DashMap::with_capacity_and_shard_amount(config.initial_capacity, shards),
            None => DashMap::with_capacity(config.initial_capacity),
        };
        Ok(Self { entries })
    }

    /// Inserts or overwrites `key`.
    pub fn set(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<(), NativeError> {
        check_key(key)?;
        let value = value.into();
        trace!(key, len = value.len(), "store set");
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Vec<u8>, NativeError> {
        self.get_with(key, <[u8]>::to_vec)
    }

    /// Runs `read` against the stored value while its shard is read-locked.
    /// Lets callers copy straight into their own buffer without an
    /// intermediate allocation.
    pub fn get_with<T>(&self, key: &str, read: impl FnOnce(&[u8]) -> T) -> Result<T, NativeError> {
        check_key(key)?;
        let entry = self.entries.get(key).ok_or(NativeError::NotFound)?;
        Ok(read(entry.value()))
    }

    pub fn delete(&self, key: &str) -> Result<(), NativeError> {
        check_key(key)?;
        trace!(key, "store delete");
        self.entries
            .remove(key)
            .map(|_| ())
            .ok_or(NativeError::NotFound)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drops every entry.
    pub fn reset(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries the table can hold before it next grows.
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

fn check_key(key: &str) -> Result<(), NativeError> {
    if key.is_empty() {
        return Err(NativeError::invalid("key must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_get_delete_scenario() {
        let store = KvStore::new();
        store.set("user:1", "alice").unwrap();
        assert_eq!(store.get("user:1").unwrap(), b"alice");
        store.delete("user:1").unwrap();
        assert_eq!(store.get("user:1"), Err(NativeError::NotFound));
        assert_eq!(store.delete("user:1"), Err(NativeError::NotFound));
    }

    #[test]
    fn set_overwrites() {
        let store = KvStore::new();
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap(), b"v2");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_key_is_rejected_without_mutation() {
        let store = KvStore::new();
        assert!(matches!(store.set("", "v"), Err(NativeError::InvalidInput(_))));
        assert!(matches!(store.get(""), Err(NativeError::InvalidInput(_))));
        assert!(matches!(store.delete(""), Err(NativeError::InvalidInput(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let store = KvStore::new();
        store.set("a", "1").unwrap();
        store.set("b", vec![0u8, 1, 2]).unwrap();
        store.reset();
        assert!(store.is_empty());
        assert!(!store.contains("a"));
    }

    #[test]
    fn binary_values_survive() {
        let store = KvStore::new();
        store.set("blob", vec![0u8, 255, 0, 7]).unwrap();
        assert_eq!(store.get("blob").unwrap(), vec![0u8, 255, 0, 7]);
    }

    #[test]
    fn rejects_bad_shard_counts() {
        for shards in [0, 1, 3, 12] {
            let config = StoreConfig {
                shards: Some(shards),
                initial_capacity: 0,
            };
            assert!(KvStore::with_config(&config).is_err(), "accepted {shards}");
        }
        let config = StoreConfig {
            shards: Some(8),
            initial_capacity: 64,
        };
        let store = KvStore::with_config(&config).unwrap();
        assert!(store.capacity() >= 64);
    }

    #[test]
    fn concurrent_writers_leave_one_whole_value() {
        let store = Arc::new(KvStore::new());
        let values: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 4096]).collect();

        let handles: Vec<_> = values
            .iter()
            .cloned()
            .map(|value| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store.set("shared", value.clone()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let seen = store.get("shared").unwrap();
        assert!(values.contains(&seen));
    }
}

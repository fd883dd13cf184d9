//! In-memory key/value store for testing.

use crate::error::StorageResult;
use crate::store::KvStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory key/value store.
///
/// This store keeps all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Runs that don't need to survive a process restart
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use shopmove_storage::{KvStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.set("greeting", b"hello").unwrap();
/// assert_eq!(store.get("greeting").unwrap().as_deref(), Some(&b"hello"[..]));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns a copy of every entry.
    ///
    /// Useful for snapshotting state in crash tests.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.entries.read().clone()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn from_snapshot(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl KvStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

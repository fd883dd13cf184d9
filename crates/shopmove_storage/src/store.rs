//! Key/value store trait definitions.

use crate::error::{StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A persistent key/value store.
///
/// Stores are **opaque byte maps**. Every piece of resumable state (task
/// list, position, breaker, ID mappings, transport preferences) lives under
/// its own string key.
///
/// # Invariants
///
/// - `get` returns exactly the bytes last passed to `set` for that key
/// - `set` replaces the whole value; there are no partial writes
/// - `remove` on a missing key is not an error
/// - Stores must be `Send + Sync`
///
/// Reads and writes of different keys are not atomic with respect to each
/// other. Callers that need consistency across keys must order their
/// writes so that a crash between them leaves a usable state.
pub trait KvStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Returns all keys currently present, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the key set cannot be enumerated.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

/// Typed access to a [`KvStore`], encoding values as CBOR.
///
/// Implemented for every `KvStore`. A value that exists but fails to
/// decode is reported as [`StorageError::Codec`]; it is never replaced by
/// the caller's default.
pub trait TypedStore: KvStore {
    /// Reads and decodes the value under `key`.
    fn get_value<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => ciborium::from_reader(bytes.as_slice())
                .map(Some)
                .map_err(|e| StorageError::codec(key, e)),
            None => Ok(None),
        }
    }

    /// Reads the value under `key`, falling back to `default` when absent.
    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> StorageResult<T> {
        Ok(self.get_value(key)?.unwrap_or(default))
    }

    /// Encodes and stores `value` under `key`.
    fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let mut buffer = Vec::new();
        ciborium::into_writer(value, &mut buffer).map_err(|e| StorageError::codec(key, e))?;
        self.set(key, &buffer)
    }
}

impl<S: KvStore + ?Sized> TypedStore for S {}

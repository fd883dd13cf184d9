//! Persisted back-end preferences.

use crate::backend::Method;
use serde::{Deserialize, Serialize};
use shopmove_storage::{KvStore, StorageResult, TypedStore};
use std::time::Duration;

const KEY_PREFIX: &str = "transport";

/// The cached outcome of back-end detection for one logical request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPreference {
    /// Id of the back-end that last worked.
    pub preferred: Option<String>,
    /// When `preferred` was recorded, in Unix seconds.
    pub last_check: u64,
    /// Always use the default (first registered) back-end, skipping detection.
    #[serde(default)]
    pub use_default: bool,
}

impl TransportPreference {
    /// Creates a preference recorded at `now`.
    pub fn detected(backend_id: impl Into<String>, now: u64) -> Self {
        Self {
            preferred: Some(backend_id.into()),
            last_check: now,
            use_default: false,
        }
    }

    /// Creates a preference pinned to the default back-end.
    pub fn pinned_default() -> Self {
        Self {
            preferred: None,
            last_check: 0,
            use_default: true,
        }
    }

    /// Returns true if the detected back-end may still be trusted at `now`.
    pub fn is_fresh(&self, now: u64, ttl: Duration) -> bool {
        self.preferred.is_some() && now.saturating_sub(self.last_check) < ttl.as_secs()
    }
}

/// Preference entries in a [`KvStore`], keyed by method and request name.
///
/// GET and POST requests with the same name are negotiated independently.
#[derive(Debug)]
pub struct PreferenceCache<S: KvStore> {
    store: S,
}

impl<S: KvStore> PreferenceCache<S> {
    /// Creates a cache over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the store key for `(method, name)`.
    pub fn key(method: Method, name: &str) -> String {
        format!("{KEY_PREFIX}.{}.{name}", method.cache_segment())
    }

    /// Loads the entry for `(method, name)`.
    pub fn load(&self, method: Method, name: &str) -> StorageResult<Option<TransportPreference>> {
        self.store.get_value(&Self::key(method, name))
    }

    /// Records `backend_id` as the working back-end at `now`.
    pub fn record(
        &self,
        method: Method,
        name: &str,
        backend_id: &str,
        now: u64,
    ) -> StorageResult<()> {
        self.store.set_value(
            &Self::key(method, name),
            &TransportPreference::detected(backend_id, now),
        )
    }

    /// Pins `(method, name)` to the default back-end.
    pub fn pin_default(&self, method: Method, name: &str) -> StorageResult<()> {
        self.store
            .set_value(&Self::key(method, name), &TransportPreference::pinned_default())
    }

    /// Drops the entry so the next call probes again.
    pub fn invalidate(&self, method: Method, name: &str) -> StorageResult<()> {
        self.store.remove(&Self::key(method, name))
    }
}

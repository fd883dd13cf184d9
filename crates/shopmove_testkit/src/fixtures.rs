//! Stores, logging and run helpers for tests.

use shopmove_engine::{DestinationApi, MigrationEngine, SourceCatalog, TickReport};
use shopmove_storage::{FileStore, InMemoryStore, KvStore};
use std::ops::Deref;
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// A [`FileStore`] in a temporary directory that is removed on drop.
pub struct TempStore {
    store: Arc<FileStore>,
    dir: TempDir,
}

impl TempStore {
    /// Creates the store.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(dir.path()).expect("Failed to open file store");
        Self {
            store: Arc::new(store),
            dir,
        }
    }

    /// Returns a shared handle to the store.
    pub fn handle(&self) -> Arc<FileStore> {
        Arc::clone(&self.store)
    }

    /// Opens a second, independent handle on the same directory, as a new
    /// process would.
    pub fn reopen(&self) -> Arc<FileStore> {
        Arc::new(FileStore::open(self.dir.path()).expect("Failed to reopen file store"))
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TempStore {
    type Target = FileStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Creates a shared in-memory store.
pub fn memory_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

/// Installs a `tracing` subscriber for tests, once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Ticks until the run completes, returning every report.
///
/// # Panics
///
/// Panics if a tick fails or the run needs more than `max_ticks` ticks.
pub fn run_to_completion<S, C, D>(
    engine: &MigrationEngine<S, C, D>,
    max_ticks: usize,
) -> Vec<TickReport>
where
    S: KvStore + 'static,
    C: SourceCatalog,
    D: DestinationApi,
{
    let mut reports = Vec::new();
    for _ in 0..max_ticks {
        let report = engine.tick().expect("tick failed");
        let done = report.is_complete();
        reports.push(report);
        if done {
            return reports;
        }
    }
    panic!("run did not complete within {max_ticks} ticks");
}

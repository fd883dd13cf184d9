//! # Shopmove Storage
//!
//! Persistent key/value store used by the migration engine and the
//! transport negotiation cache.
//!
//! Stores are **opaque byte maps** addressed by string keys. They do not
//! interpret the values they hold; typed access is layered on top by
//! [`TypedStore`], which encodes values as CBOR.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral runs
//! - [`FileStore`] - One file per key inside a directory
//!
//! ## Example
//!
//! ```rust
//! use shopmove_storage::{InMemoryStore, TypedStore};
//!
//! let store = InMemoryStore::new();
//! store.set_value("importer.current_task", &3usize).unwrap();
//! let current: usize = store.get_or("importer.current_task", 0).unwrap();
//! assert_eq!(current, 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use store::{KvStore, TypedStore};

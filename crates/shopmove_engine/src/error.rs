//! Error types for the migration engine.

use crate::catalog::CatalogError;
use crate::destination::DestinationFault;
use shopmove_storage::StorageError;
use thiserror::Error;

/// Result type for engine operations.
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors that stop an engine operation.
///
/// Failures of individual tasks are not errors at this level; they are
/// recorded in the tick report and the run continues.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The key/value store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The source catalog could not be read while planning.
    #[error("{0}")]
    Catalog(#[from] CatalogError),

    /// The destination could not be queried while planning.
    #[error("destination error: {0}")]
    Destination(#[from] DestinationFault),

    /// `tick` or `proceed` was called before `initiate`.
    #[error("migration has not been initiated")]
    NotInitiated,

    /// Persisted state violates an engine invariant.
    #[error("corrupt migration state: {0}")]
    CorruptState(String),
}

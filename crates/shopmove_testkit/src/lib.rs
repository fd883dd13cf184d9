//! # Shopmove Testkit
//!
//! Test utilities for shopmove.
//!
//! This crate provides:
//! - An in-memory source catalog with a builder
//! - A destination that records writes and fails on command
//! - Scripted HTTP back-ends for transport tests
//! - Property-based generators for catalogs
//! - Temporary stores, `tracing` setup and run helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopmove_testkit::prelude::*;
//!
//! #[test]
//! fn migrates_everything() {
//!     let catalog = MemoryCatalog::builder().product(1, "Mug", None, None, &[]).build();
//!     let engine = MigrationEngine::new(memory_store(), catalog, RecordingDestination::new());
//!     engine.initiate(Settings::default()).unwrap();
//!     run_to_completion(&engine, 10);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod destination;
pub mod fixtures;
pub mod generators;
pub mod http;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::*;
    pub use crate::destination::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::http::*;
    pub use shopmove_engine::{MigrationEngine, Settings};
}

pub use catalog::*;
pub use destination::*;
pub use fixtures::*;
pub use generators::*;
pub use http::*;

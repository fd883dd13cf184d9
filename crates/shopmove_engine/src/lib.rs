//! # Shopmove Engine
//!
//! Migrates a catalog (categories, products, variations, images) into a
//! rate-limited destination store, a few tasks at a time, resuming exactly
//! where the previous call stopped.
//!
//! This crate provides:
//! - The collaborator seams: [`SourceCatalog`] (read side) and
//!   [`DestinationApi`] (write side), plus [`HttpDestination`] which
//!   implements the latter over `shopmove_transport`
//! - The fixed catalog of task types with typed payloads
//! - A persistent [`IdMapping`] from source ids to destination ids
//! - A deterministic [`Planner`]
//! - The [`MigrationEngine`] with its time-boxed `tick`
//!
//! ## Running a migration
//!
//! `initiate` plans the whole run and stores it. Each `tick` executes at
//! most [`EngineConfig::tick_batch_size`] tasks, then persists the new
//! position and the per-type breaker set. A task that fails is recorded and
//! skipped; a task type that hits the destination's plan limit is not sent
//! again for the rest of the run.
//!
//! Create tasks write their new destination id through to the mapping
//! immediately and check it before sending, so a batch re-executed after a
//! crash does not create duplicates.
//!
//! ```rust,ignore
//! use shopmove_engine::{MigrationEngine, Settings};
//!
//! let engine = MigrationEngine::new(store, catalog, destination);
//! engine.initiate(Settings::default())?;
//! while !engine.tick()?.is_complete() {}
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod destination;
mod engine;
mod error;
mod http_destination;
mod mapping;
mod planner;
mod report;
mod settings;
mod state;
pub mod task;

#[cfg(test)]
mod fixtures;

pub use catalog::{
    CatalogError, CatalogResult, CategoryDetails, CategoryRecord, ProductDetails, ProductRecord,
    SourceCatalog, SourceId, VariationDetails, VariationRecord,
};
pub use config::{
    EngineConfig, DEFAULT_DEMO_PROBE_LIMIT, DEFAULT_MAX_PRODUCTS, DEFAULT_TICK_BATCH_SIZE,
};
pub use destination::{
    DestId, DestinationApi, DestinationFault, DestinationResult, ImageTarget, NewCategory,
    NewProduct, NewVariation, QUOTA_EXCEEDED_STATUS,
};
pub use engine::MigrationEngine;
pub use error::{MigrationError, MigrationResult};
pub use http_destination::HttpDestination;
pub use mapping::IdMapping;
pub use planner::{PlanContext, Planner};
pub use report::{CatalogSummary, PlanSummary, TickReport, TickStatus};
pub use settings::{Settings, SETTING_DELETE_DEMO, SETTING_UPDATE_BY_SKU};
pub use state::EngineState;
pub use task::{TaskDescriptor, TaskFailure, TaskPayload, TaskSuccess, TaskType};

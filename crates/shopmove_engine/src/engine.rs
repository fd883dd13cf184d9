//! The resumable migration engine.

use crate::catalog::SourceCatalog;
use crate::config::EngineConfig;
use crate::destination::{DestId, DestinationApi};
use crate::error::{MigrationError, MigrationResult};
use crate::mapping::IdMapping;
use crate::planner::{PlanContext, Planner};
use crate::report::{CatalogSummary, PlanSummary, TickReport, TickStatus};
use crate::settings::Settings;
use crate::state::{EngineState, RunStatus, StateKeys};
use crate::task::{self, TaskContext, TaskDescriptor, TaskFailure};
use shopmove_storage::{KvStore, TypedStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Plans a migration and executes it a bounded batch at a time.
///
/// The engine keeps nothing in memory between calls: every `tick` loads the
/// persisted task list, position and breaker set from the store and saves
/// them again before returning, so consecutive ticks may come from
/// different processes.
///
/// Only one tick may run at a time per key prefix.
pub struct MigrationEngine<S, C, D>
where
    S: KvStore + 'static,
    C: SourceCatalog,
    D: DestinationApi,
{
    config: EngineConfig,
    store: Arc<S>,
    catalog: C,
    destination: D,
    mapping: IdMapping,
    keys: StateKeys,
}

impl<S, C, D> MigrationEngine<S, C, D>
where
    S: KvStore + 'static,
    C: SourceCatalog,
    D: DestinationApi,
{
    /// Creates an engine with the default configuration.
    pub fn new(store: Arc<S>, catalog: C, destination: D) -> Self {
        Self::with_config(EngineConfig::default(), store, catalog, destination)
    }

    /// Creates an engine.
    pub fn with_config(config: EngineConfig, store: Arc<S>, catalog: C, destination: D) -> Self {
        let shared: Arc<dyn KvStore> = store.clone();
        let mapping = IdMapping::new(shared, &config.key_prefix);
        let keys = StateKeys::new(&config.key_prefix);
        Self {
            config,
            store,
            catalog,
            destination,
            mapping,
            keys,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the source catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Returns the destination.
    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Returns the id mapping store.
    pub fn mapping(&self) -> &IdMapping {
        &self.mapping
    }

    /// Starts a new run, discarding any previous one.
    ///
    /// Clears the id mapping and all run state, applies the forced-settings
    /// rule, plans the task list and persists it at position 0. No task is
    /// executed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails, or if the catalog or destination
    /// cannot be queried for planning.
    pub fn initiate(&self, settings: Settings) -> MigrationResult<PlanSummary> {
        self.reset()?;

        let mut settings = settings;
        let (destination_products, demo_ids) = self.detect_demo_products()?;
        if !demo_ids.is_empty() && demo_ids.len() == destination_products {
            if !settings.delete_demo_catalog {
                info!(demo = demo_ids.len(), "destination holds only demo products, deleting them");
            }
            settings.delete_demo_catalog = true;
        }
        self.store.set_value(&self.keys.settings, &settings)?;

        let ctx = PlanContext {
            demo_product_ids: if settings.delete_demo_catalog {
                demo_ids
            } else {
                Vec::new()
            },
            categories_supported: self.destination.supports_categories()?,
            max_products: self.config.max_products,
        };
        let tasks = Planner::new(&self.catalog).plan(&ctx)?;

        self.store.set_value(&self.keys.tasks, &tasks)?;
        self.store.set_value(&self.keys.current_task, &0usize)?;
        self.store.set_value(&self.keys.status, &RunStatus::default())?;

        let mut by_type = BTreeMap::new();
        for task in &tasks {
            *by_type.entry(task.task_type()).or_insert(0) += 1;
        }
        info!(
            tasks = tasks.len(),
            update_by_sku = settings.update_existing_by_sku,
            delete_demo = settings.delete_demo_catalog,
            "migration initiated"
        );

        Ok(PlanSummary {
            total_tasks: tasks.len(),
            by_type,
            settings,
        })
    }

    /// Executes the next batch of tasks.
    ///
    /// Task failures never make this return an error: they are attached to
    /// their descriptors and tallied in the report, and the run moves on.
    /// Once the run is complete every further call returns a complete report
    /// without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::NotInitiated`] before the first `initiate`,
    /// and an error if the store fails or holds inconsistent state.
    pub fn tick(&self) -> MigrationResult<TickReport> {
        let mut tasks: Vec<TaskDescriptor> = self
            .store
            .get_value(&self.keys.tasks)?
            .ok_or(MigrationError::NotInitiated)?;
        let mut current: usize = self.store.get_or(&self.keys.current_task, 0)?;
        let mut status: RunStatus = self.store.get_or(&self.keys.status, RunStatus::default())?;
        let total = tasks.len();

        if current > total {
            return Err(MigrationError::CorruptState(format!(
                "position {current} is past the {total} planned tasks"
            )));
        }
        if status.completed {
            return Ok(TickReport::complete(total));
        }

        let settings: Settings = self.store.get_or(&self.keys.settings, Settings::default())?;
        let ctx = TaskContext {
            catalog: &self.catalog,
            destination: &self.destination,
            mapping: &self.mapping,
            settings: &settings,
        };

        let mut report = TickReport::in_progress(current, total);
        let mut tasks_dirty = false;
        let mut executed = 0;

        while current < total && executed < self.config.tick_batch_size {
            let descriptor = &mut tasks[current];
            let task_type = descriptor.task_type();

            if status.rate_limited.contains(&task_type) {
                debug!(index = current, task = %task_type, "plan limit hit, not sent");
                descriptor.error = Some(TaskFailure::QuotaExceeded { message: None }.message());
                tasks_dirty = true;
                report.record_plan_limit(task_type);
            } else {
                match task::execute(&ctx, &descriptor.task)? {
                    Ok(outcome) => {
                        debug!(index = current, task = %task_type, ?outcome, "task succeeded");
                        report.record_success(task_type);
                    }
                    Err(failure) => {
                        if failure.is_quota_exceeded() && status.rate_limited.insert(task_type) {
                            warn!(task = %task_type, "plan limit reached, suspending task type");
                        }
                        let message = failure.message();
                        warn!(index = current, task = %task_type, error = %message, "task failed");
                        descriptor.error = Some(message.clone());
                        tasks_dirty = true;
                        report.record_error(task_type, message);
                    }
                }
            }

            current += 1;
            executed += 1;
        }

        // Persist once for the whole batch
        if tasks_dirty {
            self.store.set_value(&self.keys.tasks, &tasks)?;
        }
        self.store.set_value(&self.keys.current_task, &current)?;
        report.current = current;

        if current == total {
            status.completed = true;
            self.store.set_value(&self.keys.status, &status)?;
            self.store.set_value(&self.keys.catalog_imported, &true)?;
            info!(total, "migration complete");
            return Ok(TickReport {
                status: TickStatus::Complete,
                ..report
            });
        }

        self.store.set_value(&self.keys.status, &status)?;
        info!(
            current,
            total,
            succeeded = report.success.len(),
            failed = report.error.len(),
            "migration tick"
        );
        Ok(report)
    }

    /// Resumes an interrupted run with one tick, without planning again.
    ///
    /// # Errors
    ///
    /// Same as [`MigrationEngine::tick`].
    pub fn proceed(&self) -> MigrationResult<TickReport> {
        let current: usize = self.store.get_or(&self.keys.current_task, 0)?;
        info!(current, "resuming migration");
        self.tick()
    }

    /// Returns true if a task list was planned, complete or not.
    pub fn has_begun(&self) -> MigrationResult<bool> {
        Ok(self.store.get(&self.keys.tasks)?.is_some())
    }

    /// Returns true once a run has executed its last task.
    pub fn is_catalog_imported(&self) -> MigrationResult<bool> {
        Ok(self.store.get_or(&self.keys.catalog_imported, false)?)
    }

    /// Returns the settings of the current run.
    pub fn settings(&self) -> MigrationResult<Settings> {
        Ok(self.store.get_or(&self.keys.settings, Settings::default())?)
    }

    /// Returns a snapshot of the current run, if one was initiated.
    pub fn state(&self) -> MigrationResult<Option<EngineState>> {
        let Some(tasks) = self.store.get_value::<Vec<TaskDescriptor>>(&self.keys.tasks)? else {
            return Ok(None);
        };
        let status: RunStatus = self.store.get_or(&self.keys.status, RunStatus::default())?;
        Ok(Some(EngineState {
            tasks,
            current_index: self.store.get_or(&self.keys.current_task, 0)?,
            settings: self.settings()?,
            rate_limited: status.rate_limited,
            completed: status.completed,
        }))
    }

    /// Returns the destination id of a source category.
    pub fn get_mapped_category_id(&self, source: u64) -> MigrationResult<Option<DestId>> {
        self.mapping.get_mapped_category_id(source)
    }

    /// Records the destination id of a source category.
    pub fn save_mapped_category_id(&self, source: u64, dest: DestId) -> MigrationResult<()> {
        self.mapping.save_mapped_category_id(source, dest)
    }

    /// Returns the destination id of a source product.
    pub fn get_mapped_product_id(&self, source: u64) -> MigrationResult<Option<DestId>> {
        self.mapping.get_mapped_product_id(source)
    }

    /// Records the destination id of a source product.
    pub fn save_mapped_product_id(&self, source: u64, dest: DestId) -> MigrationResult<()> {
        self.mapping.save_mapped_product_id(source, dest)
    }

    /// Counts what would be migrated and what the destination already holds.
    ///
    /// Demo products come from the last detection when there was one.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or destination cannot be queried.
    pub fn catalog_summary(&self) -> MigrationResult<CatalogSummary> {
        let demo_products = match self.store.get_value::<Vec<DestId>>(&self.keys.demo_products)? {
            Some(ids) => ids.len(),
            None => self.detect_demo_products()?.1.len(),
        };

        Ok(CatalogSummary {
            source_categories: Planner::new(&self.catalog).categories(None)?.len(),
            source_products: self.catalog.count_products()?,
            destination_products: self.destination.count_products()?,
            destination_categories: self.destination.count_categories()?,
            demo_products,
        })
    }

    /// Returns the total destination product count and the demo product ids,
    /// caching the ids.
    ///
    /// Demo ids are only trusted when the whole destination catalog fits in
    /// the probe window.
    fn detect_demo_products(&self) -> MigrationResult<(usize, Vec<DestId>)> {
        let total = self.destination.count_products()?;
        let limit = self.config.demo_probe_limit;
        let ids = if total > 0 && total <= limit {
            self.destination.list_demo_products(limit)?
        } else {
            Vec::new()
        };
        debug!(total, demo = ids.len(), "probed destination for demo products");
        self.store.set_value(&self.keys.demo_products, &ids)?;
        Ok((total, ids))
    }

    fn reset(&self) -> MigrationResult<()> {
        self.mapping.clear()?;
        for key in self.keys.all() {
            self.store.remove(key)?;
        }
        Ok(())
    }
}

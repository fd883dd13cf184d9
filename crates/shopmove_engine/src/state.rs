//! Persisted run state.

use crate::settings::Settings;
use crate::task::{TaskDescriptor, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Store keys of one engine, all under a common prefix.
#[derive(Debug, Clone)]
pub(crate) struct StateKeys {
    pub tasks: String,
    pub current_task: String,
    pub status: String,
    pub settings: String,
    pub catalog_imported: String,
    pub demo_products: String,
}

impl StateKeys {
    pub fn new(prefix: &str) -> Self {
        Self {
            tasks: format!("{prefix}.tasks"),
            current_task: format!("{prefix}.current_task"),
            status: format!("{prefix}.status"),
            settings: format!("{prefix}.settings"),
            catalog_imported: format!("{prefix}.catalog_imported"),
            demo_products: format!("{prefix}.demo_products"),
        }
    }

    /// Keys a fresh initiate clears.
    pub fn all(&self) -> [&str; 6] {
        [
            self.tasks.as_str(),
            self.current_task.as_str(),
            self.status.as_str(),
            self.settings.as_str(),
            self.catalog_imported.as_str(),
            self.demo_products.as_str(),
        ]
    }
}

/// The breaker set and completion flag, saved together once per tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RunStatus {
    #[serde(default)]
    pub rate_limited: BTreeSet<TaskType>,
    #[serde(default)]
    pub completed: bool,
}

/// A read-only snapshot of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineState {
    /// The planned tasks, with errors attached to failed ones.
    pub tasks: Vec<TaskDescriptor>,
    /// Index of the next task to execute.
    pub current_index: usize,
    /// Settings the run was planned with.
    pub settings: Settings,
    /// Task types whose breaker has tripped.
    pub rate_limited: BTreeSet<TaskType>,
    /// Whether the run reported completion.
    pub completed: bool,
}

impl EngineState {
    /// Returns the number of tasks not yet executed.
    pub fn remaining(&self) -> usize {
        self.tasks.len().saturating_sub(self.current_index)
    }

    /// Returns true if every task was executed.
    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.tasks.len()
    }

    /// Returns the executed tasks that carry an error.
    pub fn failed_tasks(&self) -> impl Iterator<Item = (usize, &TaskDescriptor)> {
        self.tasks
            .iter()
            .enumerate()
            .take(self.current_index)
            .filter(|(_, task)| task.error.is_some())
    }
}

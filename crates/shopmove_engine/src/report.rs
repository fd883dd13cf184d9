//! Reports returned to callers.

use crate::settings::Settings;
use crate::task::TaskType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Whether a run has work left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStatus {
    /// Tasks remain.
    InProgress,
    /// Every task was executed.
    Complete,
}

/// What one tick did.
///
/// Tallies cover only the tasks this tick executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Whether tasks remain.
    pub status: TickStatus,
    /// Index of the next task to execute.
    pub current: usize,
    /// Number of planned tasks.
    pub total: usize,
    /// Type of every task that succeeded, in execution order.
    pub success: Vec<TaskType>,
    /// Type of every task that failed, in execution order.
    pub error: Vec<TaskType>,
    /// Failure messages counted per task type.
    pub error_messages: BTreeMap<TaskType, BTreeMap<String, u32>>,
    /// Type of every task the breaker short-circuited.
    pub plan_limit_hit: Vec<TaskType>,
}

impl TickReport {
    pub(crate) fn in_progress(current: usize, total: usize) -> Self {
        Self {
            status: TickStatus::InProgress,
            current,
            total,
            success: Vec::new(),
            error: Vec::new(),
            error_messages: BTreeMap::new(),
            plan_limit_hit: Vec::new(),
        }
    }

    pub(crate) fn complete(total: usize) -> Self {
        Self {
            status: TickStatus::Complete,
            ..Self::in_progress(total, total)
        }
    }

    pub(crate) fn record_success(&mut self, task_type: TaskType) {
        self.success.push(task_type);
    }

    pub(crate) fn record_error(&mut self, task_type: TaskType, message: String) {
        self.error.push(task_type);
        *self
            .error_messages
            .entry(task_type)
            .or_default()
            .entry(message)
            .or_insert(0) += 1;
    }

    pub(crate) fn record_plan_limit(&mut self, task_type: TaskType) {
        self.error.push(task_type);
        self.plan_limit_hit.push(task_type);
    }

    /// Returns true if the run has no work left.
    pub fn is_complete(&self) -> bool {
        self.status == TickStatus::Complete
    }

    /// Returns the number of tasks this tick executed or short-circuited.
    pub fn executed(&self) -> usize {
        self.success.len() + self.error.len()
    }
}

/// What `initiate` planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Number of planned tasks.
    pub total_tasks: usize,
    /// Planned tasks per type.
    pub by_type: BTreeMap<TaskType, usize>,
    /// Settings after the forced-settings rule.
    pub settings: Settings,
}

/// Sizes of the source and destination catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    /// Source categories that would be migrated.
    pub source_categories: usize,
    /// Source products.
    pub source_products: usize,
    /// Products at the destination.
    pub destination_products: usize,
    /// Categories at the destination.
    pub destination_categories: usize,
    /// Demo products detected at the destination.
    pub demo_products: usize,
}

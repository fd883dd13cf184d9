//! Task descriptors, the task contract and the variant registry.
//!
//! Every unit of migration work is a [`TaskDescriptor`]: a typed
//! [`TaskPayload`] plus the error message the engine attaches after a failed
//! execution. Each payload variant has one implementation of the [`Task`]
//! contract, and [`execute`] is the central registry that dispatches a
//! descriptor to it.

mod category;
mod delete;
mod image;
mod product;
mod variation;

pub use category::CategoryPayload;
pub use delete::DeletePayload;
pub use image::GalleryPayload;
pub use product::ProductPayload;
pub use variation::VariationPayload;

pub(crate) use category::{CreateCategoryTask, UploadCategoryImageTask};
pub(crate) use delete::DeleteProductsTask;
pub(crate) use image::UploadGalleryImageTask;
pub(crate) use product::{CreateProductTask, UploadProductImageTask};
pub(crate) use variation::{CreateProductVariationTask, UploadVariationImageTask};

use crate::catalog::{CatalogError, SourceCatalog};
use crate::destination::{DestinationApi, DestinationFault, QUOTA_EXCEEDED_STATUS};
use crate::error::{MigrationError, MigrationResult};
use crate::mapping::IdMapping;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// The fixed catalog of task kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Delete demo products at the destination.
    DeleteProducts,
    /// Create one category.
    CreateCategory,
    /// Upload a category image.
    UploadCategoryImage,
    /// Create or update one product.
    CreateProduct,
    /// Upload a product's primary image.
    UploadProductImage,
    /// Create one product variation.
    CreateProductVariation,
    /// Upload a variation image.
    UploadVariationImage,
    /// Upload one additional gallery image.
    UploadGalleryImage,
}

impl TaskType {
    /// Returns the snake_case name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::DeleteProducts => "delete_products",
            TaskType::CreateCategory => "create_category",
            TaskType::UploadCategoryImage => "upload_category_image",
            TaskType::CreateProduct => "create_product",
            TaskType::UploadProductImage => "upload_product_image",
            TaskType::CreateProductVariation => "create_product_variation",
            TaskType::UploadVariationImage => "upload_variation_image",
            TaskType::UploadGalleryImage => "upload_gallery_image",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The typed payload of a task, tagged by its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TaskPayload {
    /// See [`TaskType::DeleteProducts`].
    DeleteProducts(DeletePayload),
    /// See [`TaskType::CreateCategory`].
    CreateCategory(CategoryPayload),
    /// See [`TaskType::UploadCategoryImage`].
    UploadCategoryImage(CategoryPayload),
    /// See [`TaskType::CreateProduct`].
    CreateProduct(ProductPayload),
    /// See [`TaskType::UploadProductImage`].
    UploadProductImage(ProductPayload),
    /// See [`TaskType::CreateProductVariation`].
    CreateProductVariation(VariationPayload),
    /// See [`TaskType::UploadVariationImage`].
    UploadVariationImage(VariationPayload),
    /// See [`TaskType::UploadGalleryImage`].
    UploadGalleryImage(GalleryPayload),
}

impl TaskPayload {
    /// Returns the task type of this payload.
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskPayload::DeleteProducts(_) => TaskType::DeleteProducts,
            TaskPayload::CreateCategory(_) => TaskType::CreateCategory,
            TaskPayload::UploadCategoryImage(_) => TaskType::UploadCategoryImage,
            TaskPayload::CreateProduct(_) => TaskType::CreateProduct,
            TaskPayload::UploadProductImage(_) => TaskType::UploadProductImage,
            TaskPayload::CreateProductVariation(_) => TaskType::CreateProductVariation,
            TaskPayload::UploadVariationImage(_) => TaskType::UploadVariationImage,
            TaskPayload::UploadGalleryImage(_) => TaskType::UploadGalleryImage,
        }
    }
}

/// One planned unit of work.
///
/// Identity is positional: a descriptor is addressed by its index in the
/// persisted task list. Only `error` changes after planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// What to do.
    pub task: TaskPayload,
    /// Message of the last failed execution.
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskDescriptor {
    /// Creates a descriptor with no error.
    pub fn new(task: TaskPayload) -> Self {
        Self { task, error: None }
    }

    /// Returns the task type.
    pub fn task_type(&self) -> TaskType {
        self.task.task_type()
    }
}

/// Why a task did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The destination plan's quota is exhausted. Trips the breaker.
    #[error("{}", quota_display(.message))]
    QuotaExceeded {
        /// Message the destination sent, if any.
        message: Option<String>,
    },

    /// The destination rejected the request.
    #[error("{message}")]
    ApiFault {
        /// Status code, when a response was received.
        status: Option<u16>,
        /// The destination's message.
        message: String,
    },

    /// The task declined to run.
    #[error("{0}")]
    SkippedByPolicy(String),

    /// No transport delivered the request.
    #[error("{0}")]
    TransportFailure(String),

    /// The source catalog could not be read.
    #[error("{0}")]
    SourceUnavailable(String),
}

fn quota_display(message: &Option<String>) -> String {
    message.clone().unwrap_or_else(|| "plan limit reached".into())
}

impl TaskFailure {
    /// Creates a skip.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::SkippedByPolicy(reason.into())
    }

    /// Returns true if this failure trips the breaker for its task type.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Returns the human-readable message recorded against the task.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<DestinationFault> for TaskFailure {
    fn from(fault: DestinationFault) -> Self {
        match fault {
            DestinationFault::Api { status, message } if status == QUOTA_EXCEEDED_STATUS => {
                TaskFailure::QuotaExceeded { message }
            }
            DestinationFault::Api { status, message } => TaskFailure::ApiFault {
                status: Some(status),
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
            },
            DestinationFault::Transport(message) => TaskFailure::TransportFailure(message),
            DestinationFault::Malformed(message) => TaskFailure::ApiFault {
                status: None,
                message: format!("unexpected response: {message}"),
            },
        }
    }
}

impl From<CatalogError> for TaskFailure {
    fn from(err: CatalogError) -> Self {
        TaskFailure::SourceUnavailable(err.0)
    }
}

/// How a task completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSuccess {
    /// The destination was changed.
    Done,
    /// The id mapping shows the work was already done; nothing was sent.
    AlreadyDone,
}

/// Result of executing one task.
pub type TaskOutcome = Result<TaskSuccess, TaskFailure>;

/// Everything a task may use while executing.
pub struct TaskContext<'a> {
    /// Source catalog.
    pub catalog: &'a dyn SourceCatalog,
    /// Destination API.
    pub destination: &'a dyn DestinationApi,
    /// Id mapping store.
    pub mapping: &'a IdMapping,
    /// Run settings.
    pub settings: &'a Settings,
}

/// Early exit from a task body: either the task failed or the store did.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Failed(TaskFailure),
    Fatal(MigrationError),
}

impl From<TaskFailure> for Interrupt {
    fn from(failure: TaskFailure) -> Self {
        Interrupt::Failed(failure)
    }
}

impl From<DestinationFault> for Interrupt {
    fn from(fault: DestinationFault) -> Self {
        Interrupt::Failed(fault.into())
    }
}

impl From<CatalogError> for Interrupt {
    fn from(err: CatalogError) -> Self {
        Interrupt::Failed(err.into())
    }
}

impl From<MigrationError> for Interrupt {
    fn from(err: MigrationError) -> Self {
        Interrupt::Fatal(err)
    }
}

/// Body result of a task.
pub(crate) type Step = Result<TaskSuccess, Interrupt>;

/// The contract every task variant implements.
pub(crate) trait Task {
    /// Type recorded in reports and the breaker.
    const TYPE: TaskType;

    /// Strongly-typed payload.
    type Payload;

    /// Wraps a payload into a descriptor.
    fn build(payload: Self::Payload) -> TaskDescriptor;

    /// Performs the work.
    fn run(ctx: &TaskContext<'_>, payload: &Self::Payload) -> Step;

    /// Performs the work, splitting task failures from store failures.
    fn execute(ctx: &TaskContext<'_>, payload: &Self::Payload) -> MigrationResult<TaskOutcome> {
        trace!(task = %Self::TYPE, "executing task");
        match Self::run(ctx, payload) {
            Ok(success) => Ok(Ok(success)),
            Err(Interrupt::Failed(failure)) => Ok(Err(failure)),
            Err(Interrupt::Fatal(err)) => Err(err),
        }
    }
}

/// Dispatches `payload` to its variant implementation.
///
/// # Errors
///
/// Returns an error only when the store fails; task failures are returned
/// inside the [`TaskOutcome`].
pub fn execute(ctx: &TaskContext<'_>, payload: &TaskPayload) -> MigrationResult<TaskOutcome> {
    match payload {
        TaskPayload::DeleteProducts(p) => DeleteProductsTask::execute(ctx, p),
        TaskPayload::CreateCategory(p) => CreateCategoryTask::execute(ctx, p),
        TaskPayload::UploadCategoryImage(p) => UploadCategoryImageTask::execute(ctx, p),
        TaskPayload::CreateProduct(p) => CreateProductTask::execute(ctx, p),
        TaskPayload::UploadProductImage(p) => UploadProductImageTask::execute(ctx, p),
        TaskPayload::CreateProductVariation(p) => CreateProductVariationTask::execute(ctx, p),
        TaskPayload::UploadVariationImage(p) => UploadVariationImageTask::execute(ctx, p),
        TaskPayload::UploadGalleryImage(p) => UploadGalleryImageTask::execute(ctx, p),
    }
}

/// Loads image bytes, skipping when the image is gone.
pub(crate) fn image_bytes(ctx: &TaskContext<'_>, image_id: u64) -> Result<Vec<u8>, Interrupt> {
    ctx.catalog
        .image(image_id)?
        .ok_or_else(|| TaskFailure::skipped(format!("image {image_id} not found in source")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_names() {
        assert_eq!(TaskType::CreateProductVariation.to_string(), "create_product_variation");
        assert_eq!(
            serde_json::to_value(TaskType::UploadGalleryImage).unwrap(),
            serde_json::json!("upload_gallery_image")
        );
    }

    #[test]
    fn descriptor_json_shape() {
        let descriptor = TaskDescriptor::new(TaskPayload::CreateCategory(CategoryPayload {
            category_id: 4,
            parent_id: Some(1),
        }));
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "task": {
                    "type": "create_category",
                    "payload": {"category_id": 4, "parent_id": 1}
                },
                "error": null
            })
        );
        assert_eq!(descriptor.task_type(), TaskType::CreateCategory);
    }

    #[test]
    fn fault_classification() {
        let quota: TaskFailure = DestinationFault::api(402, None).into();
        assert!(quota.is_quota_exceeded());
        assert_eq!(quota.message(), "plan limit reached");

        let api: TaskFailure = DestinationFault::api(400, Some("sku taken".into())).into();
        assert_eq!(
            api,
            TaskFailure::ApiFault {
                status: Some(400),
                message: "sku taken".into()
            }
        );

        let transport: TaskFailure = DestinationFault::Transport("refused".into()).into();
        assert!(matches!(transport, TaskFailure::TransportFailure(_)));

        let source: TaskFailure = CatalogError::new("db gone").into();
        assert_eq!(source.message(), "db gone");
    }
}

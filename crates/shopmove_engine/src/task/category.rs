use super::{
    image_bytes, Step, Task, TaskContext, TaskDescriptor, TaskFailure, TaskPayload, TaskSuccess,
    TaskType,
};
use crate::catalog::SourceId;
use crate::destination::{ImageTarget, NewCategory};
use serde::{Deserialize, Serialize};

/// Payload of the category tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPayload {
    /// Source category.
    pub category_id: SourceId,
    /// Source parent, `None` for roots.
    pub parent_id: Option<SourceId>,
}

pub(crate) struct CreateCategoryTask;

impl Task for CreateCategoryTask {
    const TYPE: TaskType = TaskType::CreateCategory;
    type Payload = CategoryPayload;

    fn build(payload: CategoryPayload) -> TaskDescriptor {
        TaskDescriptor::new(TaskPayload::CreateCategory(payload))
    }

    fn run(ctx: &TaskContext<'_>, payload: &CategoryPayload) -> Step {
        if ctx.mapping.get_mapped_category_id(payload.category_id)?.is_some() {
            return Ok(TaskSuccess::AlreadyDone);
        }

        let parent_id = match payload.parent_id {
            Some(parent) => Some(ctx.mapping.get_mapped_category_id(parent)?.ok_or_else(|| {
                TaskFailure::skipped(format!("parent category {parent} was not migrated"))
            })?),
            None => None,
        };

        let details = ctx.catalog.category(payload.category_id)?.ok_or_else(|| {
            TaskFailure::skipped(format!("category {} not found in source", payload.category_id))
        })?;

        let dest = ctx.destination.create_category(&NewCategory {
            name: details.name,
            description: details.description,
            parent_id,
        })?;
        ctx.mapping.save_mapped_category_id(payload.category_id, dest)?;
        Ok(TaskSuccess::Done)
    }
}

pub(crate) struct UploadCategoryImageTask;

impl Task for UploadCategoryImageTask {
    const TYPE: TaskType = TaskType::UploadCategoryImage;
    type Payload = CategoryPayload;

    fn build(payload: CategoryPayload) -> TaskDescriptor {
        TaskDescriptor::new(TaskPayload::UploadCategoryImage(payload))
    }

    fn run(ctx: &TaskContext<'_>, payload: &CategoryPayload) -> Step {
        let dest = ctx
            .mapping
            .get_mapped_category_id(payload.category_id)?
            .ok_or_else(|| {
                TaskFailure::skipped(format!("category {} was not migrated", payload.category_id))
            })?;

        let image_id = ctx
            .catalog
            .category(payload.category_id)?
            .and_then(|details| details.image_id)
            .ok_or_else(|| {
                TaskFailure::skipped(format!("category {} has no image", payload.category_id))
            })?;

        let bytes = image_bytes(ctx, image_id)?;
        ctx.destination
            .upload_image(ImageTarget::Category(dest), &bytes)?;
        Ok(TaskSuccess::Done)
    }
}

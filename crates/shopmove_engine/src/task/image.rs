use super::product::mapped_product;
use super::{image_bytes, Step, Task, TaskContext, TaskDescriptor, TaskPayload, TaskSuccess, TaskType};
use crate::catalog::SourceId;
use crate::destination::ImageTarget;
use serde::{Deserialize, Serialize};

/// Payload of an upload-gallery-image task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryPayload {
    /// Source product.
    pub product_id: SourceId,
    /// Source image.
    pub image_id: SourceId,
}

pub(crate) struct UploadGalleryImageTask;

impl Task for UploadGalleryImageTask {
    const TYPE: TaskType = TaskType::UploadGalleryImage;
    type Payload = GalleryPayload;

    fn build(payload: GalleryPayload) -> TaskDescriptor {
        TaskDescriptor::new(TaskPayload::UploadGalleryImage(payload))
    }

    fn run(ctx: &TaskContext<'_>, payload: &GalleryPayload) -> Step {
        let product = mapped_product(ctx, payload.product_id)?;
        let bytes = image_bytes(ctx, payload.image_id)?;
        ctx.destination.upload_image(
            ImageTarget::Gallery {
                product,
                source_image: payload.image_id,
            },
            &bytes,
        )?;
        Ok(TaskSuccess::Done)
    }
}

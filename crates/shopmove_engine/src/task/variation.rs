use super::product::mapped_product;
use super::{
    image_bytes, Step, Task, TaskContext, TaskDescriptor, TaskFailure, TaskPayload, TaskSuccess,
    TaskType,
};
use crate::catalog::SourceId;
use crate::destination::{ImageTarget, NewVariation};
use serde::{Deserialize, Serialize};

/// Payload of the variation tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationPayload {
    /// Source product owning the variation.
    pub product_id: SourceId,
    /// Source variation.
    pub variation_id: SourceId,
}

pub(crate) struct CreateProductVariationTask;

impl Task for CreateProductVariationTask {
    const TYPE: TaskType = TaskType::CreateProductVariation;
    type Payload = VariationPayload;

    fn build(payload: VariationPayload) -> TaskDescriptor {
        TaskDescriptor::new(TaskPayload::CreateProductVariation(payload))
    }

    fn run(ctx: &TaskContext<'_>, payload: &VariationPayload) -> Step {
        let product = mapped_product(ctx, payload.product_id)?;
        if ctx
            .mapping
            .get_mapped_variation_id(payload.product_id, payload.variation_id)?
            .is_some()
        {
            return Ok(TaskSuccess::AlreadyDone);
        }

        let details = ctx
            .catalog
            .variation(payload.product_id, payload.variation_id)?
            .ok_or_else(|| {
                TaskFailure::skipped(format!(
                    "variation {} of product {} not found in source",
                    payload.variation_id, payload.product_id
                ))
            })?;

        let dest = ctx.destination.create_variation(
            product,
            &NewVariation {
                sku: details.sku,
                price: details.price,
                quantity: details.quantity,
                options: details.options,
            },
        )?;
        ctx.mapping
            .save_mapped_variation_id(payload.product_id, payload.variation_id, dest)?;
        Ok(TaskSuccess::Done)
    }
}

pub(crate) struct UploadVariationImageTask;

impl Task for UploadVariationImageTask {
    const TYPE: TaskType = TaskType::UploadVariationImage;
    type Payload = VariationPayload;

    fn build(payload: VariationPayload) -> TaskDescriptor {
        TaskDescriptor::new(TaskPayload::UploadVariationImage(payload))
    }

    fn run(ctx: &TaskContext<'_>, payload: &VariationPayload) -> Step {
        let product = mapped_product(ctx, payload.product_id)?;
        let variation = ctx
            .mapping
            .get_mapped_variation_id(payload.product_id, payload.variation_id)?
            .ok_or_else(|| {
                TaskFailure::skipped(format!(
                    "variation {} was not migrated",
                    payload.variation_id
                ))
            })?;

        let image_id = ctx
            .catalog
            .variation(payload.product_id, payload.variation_id)?
            .and_then(|details| details.image_id)
            .ok_or_else(|| {
                TaskFailure::skipped(format!("variation {} has no image", payload.variation_id))
            })?;

        let bytes = image_bytes(ctx, image_id)?;
        ctx.destination
            .upload_image(ImageTarget::Variation { product, variation }, &bytes)?;
        Ok(TaskSuccess::Done)
    }
}

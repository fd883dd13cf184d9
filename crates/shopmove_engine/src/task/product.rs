use super::{
    image_bytes, Step, Task, TaskContext, TaskDescriptor, TaskFailure, TaskPayload, TaskSuccess,
    TaskType,
};
use crate::catalog::{ProductDetails, SourceId};
use crate::destination::{DestId, ImageTarget, NewProduct};
use crate::error::MigrationResult;
use crate::mapping::IdMapping;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Payload of the product tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPayload {
    /// Source product.
    pub product_id: SourceId,
}

pub(crate) struct CreateProductTask;

impl Task for CreateProductTask {
    const TYPE: TaskType = TaskType::CreateProduct;
    type Payload = ProductPayload;

    fn build(payload: ProductPayload) -> TaskDescriptor {
        TaskDescriptor::new(TaskPayload::CreateProduct(payload))
    }

    fn run(ctx: &TaskContext<'_>, payload: &ProductPayload) -> Step {
        if ctx.mapping.get_mapped_product_id(payload.product_id)?.is_some() {
            return Ok(TaskSuccess::AlreadyDone);
        }

        let details = ctx.catalog.product(payload.product_id)?.ok_or_else(|| {
            TaskFailure::skipped(format!("product {} not found in source", payload.product_id))
        })?;
        let product = new_product(ctx.mapping, details)?;

        if ctx.settings.update_existing_by_sku {
            if let Some(sku) = product.sku.as_deref().filter(|sku| !sku.is_empty()) {
                if let Some(existing) = ctx.destination.find_product_by_sku(sku)? {
                    debug!(product = payload.product_id, existing, sku, "updating product by sku");
                    ctx.destination.update_product(existing, &product)?;
                    ctx.mapping.save_mapped_product_id(payload.product_id, existing)?;
                    return Ok(TaskSuccess::Done);
                }
            }
        }

        let dest = ctx.destination.create_product(&product)?;
        ctx.mapping.save_mapped_product_id(payload.product_id, dest)?;
        Ok(TaskSuccess::Done)
    }
}

/// Converts source details, resolving categories through the mapping.
/// Categories that were not migrated are left out.
fn new_product(mapping: &IdMapping, details: ProductDetails) -> MigrationResult<NewProduct> {
    let mut category_ids: Vec<DestId> = Vec::with_capacity(details.category_ids.len());
    for source in &details.category_ids {
        if let Some(dest) = mapping.get_mapped_category_id(*source)? {
            category_ids.push(dest);
        }
    }

    Ok(NewProduct {
        name: details.name,
        sku: details.sku,
        description: details.description,
        price: details.price,
        quantity: details.quantity,
        enabled: details.enabled,
        category_ids,
    })
}

pub(crate) struct UploadProductImageTask;

impl Task for UploadProductImageTask {
    const TYPE: TaskType = TaskType::UploadProductImage;
    type Payload = ProductPayload;

    fn build(payload: ProductPayload) -> TaskDescriptor {
        TaskDescriptor::new(TaskPayload::UploadProductImage(payload))
    }

    fn run(ctx: &TaskContext<'_>, payload: &ProductPayload) -> Step {
        let dest = mapped_product(ctx, payload.product_id)?;
        let image_id = ctx
            .catalog
            .product(payload.product_id)?
            .and_then(|details| details.image_id)
            .ok_or_else(|| {
                TaskFailure::skipped(format!("product {} has no image", payload.product_id))
            })?;

        let bytes = image_bytes(ctx, image_id)?;
        ctx.destination.upload_image(ImageTarget::Product(dest), &bytes)?;
        Ok(TaskSuccess::Done)
    }
}

/// Resolves the destination id of a product, skipping when it is missing.
pub(crate) fn mapped_product(
    ctx: &TaskContext<'_>,
    product_id: SourceId,
) -> Result<DestId, super::Interrupt> {
    ctx.mapping
        .get_mapped_product_id(product_id)?
        .ok_or_else(|| TaskFailure::skipped(format!("product {product_id} was not migrated")).into())
}

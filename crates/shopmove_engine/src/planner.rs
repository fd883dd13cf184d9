//! Deterministic task planning.

use crate::catalog::{CatalogResult, CategoryRecord, SourceCatalog, SourceId};
use crate::destination::DestId;
use crate::task::{
    CategoryPayload, CreateCategoryTask, CreateProductTask, CreateProductVariationTask,
    DeletePayload, DeleteProductsTask, GalleryPayload, ProductPayload, Task, TaskDescriptor,
    UploadCategoryImageTask, UploadGalleryImageTask, UploadProductImageTask,
    UploadVariationImageTask, VariationPayload,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Destination facts the plan depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanContext {
    /// Demo products to delete first; empty to keep them.
    pub demo_product_ids: Vec<DestId>,
    /// Whether the destination accepts categories.
    pub categories_supported: bool,
    /// Upper bound on products fetched from the source.
    pub max_products: usize,
}

/// Builds the ordered task list from a source catalog.
///
/// The order is the execution order and encodes every dependency: a
/// category is created before its image and its children, a product before
/// its image, variations and gallery.
pub struct Planner<'a> {
    catalog: &'a dyn SourceCatalog,
}

impl<'a> Planner<'a> {
    /// Creates a planner over `catalog`.
    pub fn new(catalog: &'a dyn SourceCatalog) -> Self {
        Self { catalog }
    }

    /// Plans a full run.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be listed.
    pub fn plan(&self, ctx: &PlanContext) -> CatalogResult<Vec<TaskDescriptor>> {
        let mut tasks = Vec::new();

        if !ctx.demo_product_ids.is_empty() {
            tasks.push(DeleteProductsTask::build(DeletePayload {
                ids: ctx.demo_product_ids.clone(),
            }));
        }

        if ctx.categories_supported {
            for category in self.categories(None)? {
                let payload = CategoryPayload {
                    category_id: category.id,
                    parent_id: category.parent_id,
                };
                tasks.push(CreateCategoryTask::build(payload.clone()));
                if category.has_image {
                    tasks.push(UploadCategoryImageTask::build(payload));
                }
            }
        }

        let products = self.catalog.list_products(ctx.max_products)?;
        for product in products.into_iter().take(ctx.max_products) {
            let payload = ProductPayload {
                product_id: product.id,
            };
            tasks.push(CreateProductTask::build(payload.clone()));
            if product.has_image() {
                tasks.push(UploadProductImageTask::build(payload));
            }

            if product.is_variable {
                for variation in self.catalog.get_variations(product.id)? {
                    let payload = VariationPayload {
                        product_id: product.id,
                        variation_id: variation.variation_id,
                    };
                    tasks.push(CreateProductVariationTask::build(payload.clone()));
                    if variation.image_id.is_some() && variation.image_id != product.image_id {
                        tasks.push(UploadVariationImageTask::build(payload));
                    }
                }
            }

            for image_id in product.gallery_image_ids {
                tasks.push(UploadGalleryImageTask::build(GalleryPayload {
                    product_id: product.id,
                    image_id,
                }));
            }
        }

        debug!(tasks = tasks.len(), "planned migration");
        Ok(tasks)
    }

    /// Returns the surviving categories under `parent`, depth-first with
    /// each parent before its children.
    ///
    /// The default category is left out unless something survives below it.
    /// A category reached a second time, through a cycle in the parent
    /// links, is not visited again.
    pub fn categories(&self, parent: Option<SourceId>) -> CatalogResult<Vec<CategoryRecord>> {
        let mut visited = BTreeSet::new();
        if let Some(id) = parent {
            visited.insert(id);
        }
        self.walk(parent, self.catalog.default_category_id(), &mut visited)
    }

    fn walk(
        &self,
        parent: Option<SourceId>,
        default: Option<SourceId>,
        visited: &mut BTreeSet<SourceId>,
    ) -> CatalogResult<Vec<CategoryRecord>> {
        let mut out = Vec::new();

        for category in self.catalog.list_categories(parent)? {
            if !visited.insert(category.id) {
                debug!(category = category.id, "category already visited, skipping");
                continue;
            }
            let children = self.walk(Some(category.id), default, visited)?;
            if Some(category.id) == default && children.is_empty() {
                continue;
            }
            out.push(CategoryRecord {
                parent_id: parent,
                ..category
            });
            out.extend(children);
        }
        Ok(out)
    }
}

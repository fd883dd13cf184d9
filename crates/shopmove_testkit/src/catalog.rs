//! An in-memory source catalog.

use shopmove_engine::{
    CatalogError, CatalogResult, CategoryDetails, CategoryRecord, ProductDetails, ProductRecord,
    SourceCatalog, SourceId, VariationDetails, VariationRecord,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A source catalog held in memory, built with [`MemoryCatalog::builder`].
///
/// Listings are ordered by id, so planning over it is deterministic.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    categories: BTreeMap<SourceId, (CategoryRecord, CategoryDetails)>,
    default_category: Option<SourceId>,
    products: BTreeMap<SourceId, (ProductRecord, ProductDetails)>,
    variations: BTreeMap<(SourceId, SourceId), (VariationRecord, VariationDetails)>,
    images: BTreeMap<SourceId, Vec<u8>>,
    unavailable: AtomicBool,
}

impl MemoryCatalog {
    /// Starts an empty catalog.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Makes every read fail until called again with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> CatalogResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CatalogError::new("source catalog unavailable"))
        } else {
            Ok(())
        }
    }
}

impl SourceCatalog for MemoryCatalog {
    fn list_categories(&self, parent: Option<SourceId>) -> CatalogResult<Vec<CategoryRecord>> {
        self.check()?;
        Ok(self
            .categories
            .values()
            .filter(|(record, _)| record.parent_id == parent)
            .map(|(record, _)| record.clone())
            .collect())
    }

    fn default_category_id(&self) -> Option<SourceId> {
        self.default_category
    }

    fn list_products(&self, limit: usize) -> CatalogResult<Vec<ProductRecord>> {
        self.check()?;
        Ok(self
            .products
            .values()
            .take(limit)
            .map(|(record, _)| record.clone())
            .collect())
    }

    fn get_variations(&self, product_id: SourceId) -> CatalogResult<Vec<VariationRecord>> {
        self.check()?;
        Ok(self
            .variations
            .range((product_id, 0)..=(product_id, SourceId::MAX))
            .map(|(_, (record, _))| record.clone())
            .collect())
    }

    fn count_products(&self) -> CatalogResult<usize> {
        self.check()?;
        Ok(self.products.len())
    }

    fn category(&self, id: SourceId) -> CatalogResult<Option<CategoryDetails>> {
        self.check()?;
        Ok(self.categories.get(&id).map(|(_, details)| details.clone()))
    }

    fn product(&self, id: SourceId) -> CatalogResult<Option<ProductDetails>> {
        self.check()?;
        Ok(self.products.get(&id).map(|(_, details)| details.clone()))
    }

    fn variation(
        &self,
        product_id: SourceId,
        variation_id: SourceId,
    ) -> CatalogResult<Option<VariationDetails>> {
        self.check()?;
        Ok(self
            .variations
            .get(&(product_id, variation_id))
            .map(|(_, details)| details.clone()))
    }

    fn image(&self, image_id: SourceId) -> CatalogResult<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.images.get(&image_id).cloned())
    }
}

/// Builder for [`MemoryCatalog`].
///
/// Every image id handed to the builder gets placeholder bytes unless
/// [`CatalogBuilder::without_image_bytes`] removes them.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: MemoryCatalog,
}

impl CatalogBuilder {
    /// Adds a category.
    pub fn category(
        mut self,
        id: SourceId,
        parent_id: Option<SourceId>,
        name: &str,
        image_id: Option<SourceId>,
    ) -> Self {
        self.add_image(image_id);
        self.catalog.categories.insert(
            id,
            (
                CategoryRecord {
                    id,
                    parent_id,
                    has_image: image_id.is_some(),
                },
                CategoryDetails {
                    name: name.to_string(),
                    description: None,
                    image_id,
                },
            ),
        );
        self
    }

    /// Marks `id` as the catch-all category.
    pub fn default_category(mut self, id: SourceId) -> Self {
        self.catalog.default_category = Some(id);
        self
    }

    /// Adds a simple product.
    pub fn product(
        mut self,
        id: SourceId,
        name: &str,
        sku: Option<&str>,
        image_id: Option<SourceId>,
        category_ids: &[SourceId],
    ) -> Self {
        self.add_image(image_id);
        self.catalog.products.insert(
            id,
            (
                ProductRecord {
                    id,
                    image_id,
                    gallery_image_ids: Vec::new(),
                    is_variable: false,
                },
                ProductDetails {
                    name: name.to_string(),
                    sku: sku.map(str::to_string),
                    description: None,
                    price: 10.0,
                    quantity: None,
                    enabled: true,
                    category_ids: category_ids.to_vec(),
                    image_id,
                },
            ),
        );
        self
    }

    /// Appends gallery images to a product added earlier.
    pub fn gallery(mut self, product_id: SourceId, image_ids: &[SourceId]) -> Self {
        for image_id in image_ids {
            self.add_image(Some(*image_id));
        }
        if let Some((record, _)) = self.catalog.products.get_mut(&product_id) {
            record.gallery_image_ids.extend_from_slice(image_ids);
        }
        self
    }

    /// Adds a variation to a product added earlier, making it variable.
    pub fn variation(
        mut self,
        product_id: SourceId,
        variation_id: SourceId,
        image_id: Option<SourceId>,
    ) -> Self {
        self.add_image(image_id);
        if let Some((record, _)) = self.catalog.products.get_mut(&product_id) {
            record.is_variable = true;
        }
        self.catalog.variations.insert(
            (product_id, variation_id),
            (
                VariationRecord {
                    variation_id,
                    image_id,
                },
                VariationDetails {
                    sku: Some(format!("SKU-{product_id}-{variation_id}")),
                    price: None,
                    quantity: None,
                    options: BTreeMap::from([(
                        "Option".to_string(),
                        format!("Value {variation_id}"),
                    )]),
                    image_id,
                },
            ),
        );
        self
    }

    /// Forgets the bytes of an image so uploading it is skipped.
    pub fn without_image_bytes(mut self, image_id: SourceId) -> Self {
        self.catalog.images.remove(&image_id);
        self
    }

    /// Finishes the catalog.
    pub fn build(self) -> MemoryCatalog {
        self.catalog
    }

    fn add_image(&mut self, image_id: Option<SourceId>) {
        if let Some(id) = image_id {
            self.catalog
                .images
                .insert(id, format!("image-{id}").into_bytes());
        }
    }
}

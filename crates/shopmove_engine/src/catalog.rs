//! The read-only source catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Identifier of an entity in the source catalog.
pub type SourceId = u64;

/// Result type for catalog reads.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// A source catalog read failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("catalog error: {0}")]
pub struct CatalogError(pub String);

impl CatalogError {
    /// Creates an error with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A category as listed during planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Source id.
    pub id: SourceId,
    /// Source parent, `None` for roots.
    pub parent_id: Option<SourceId>,
    /// Whether the category has an image.
    pub has_image: bool,
}

/// A product as listed during planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Source id.
    pub id: SourceId,
    /// Primary image, if any.
    pub image_id: Option<SourceId>,
    /// Gallery images in display order.
    pub gallery_image_ids: Vec<SourceId>,
    /// Whether the product has variations.
    pub is_variable: bool,
}

impl ProductRecord {
    /// Returns true if the product has a primary image.
    pub fn has_image(&self) -> bool {
        self.image_id.is_some()
    }
}

/// A product variation as listed during planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationRecord {
    /// Source id of the variation.
    pub variation_id: SourceId,
    /// Variation image, if any.
    pub image_id: Option<SourceId>,
}

/// Everything needed to create a category at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDetails {
    /// Display name.
    pub name: String,
    /// Description markup.
    pub description: Option<String>,
    /// Image, if any.
    pub image_id: Option<SourceId>,
}

/// Everything needed to create or update a product at the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    /// Display name.
    pub name: String,
    /// Stock keeping unit.
    pub sku: Option<String>,
    /// Description markup.
    pub description: Option<String>,
    /// Base price.
    pub price: f64,
    /// Stock on hand; `None` for unlimited.
    pub quantity: Option<u32>,
    /// Whether the product is visible in the storefront.
    pub enabled: bool,
    /// Source categories the product belongs to.
    pub category_ids: Vec<SourceId>,
    /// Primary image, if any.
    pub image_id: Option<SourceId>,
}

/// Everything needed to create a variation at the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationDetails {
    /// Stock keeping unit.
    pub sku: Option<String>,
    /// Price override.
    pub price: Option<f64>,
    /// Stock on hand; `None` for unlimited.
    pub quantity: Option<u32>,
    /// Option name to selected value.
    pub options: BTreeMap<String, String>,
    /// Image, if any.
    pub image_id: Option<SourceId>,
}

/// Read access to the catalog being migrated.
///
/// Listing methods feed the planner; detail methods are used by tasks when
/// they execute. A detail method returns `Ok(None)` when the entity no
/// longer exists.
pub trait SourceCatalog {
    /// Lists direct children of `parent`, or the roots for `None`.
    fn list_categories(&self, parent: Option<SourceId>) -> CatalogResult<Vec<CategoryRecord>>;

    /// Returns the catch-all category, if the catalog has one.
    fn default_category_id(&self) -> Option<SourceId>;

    /// Lists up to `limit` products.
    fn list_products(&self, limit: usize) -> CatalogResult<Vec<ProductRecord>>;

    /// Lists the variations of a variable product.
    fn get_variations(&self, product_id: SourceId) -> CatalogResult<Vec<VariationRecord>>;

    /// Returns the total product count.
    fn count_products(&self) -> CatalogResult<usize>;

    /// Loads a category.
    fn category(&self, id: SourceId) -> CatalogResult<Option<CategoryDetails>>;

    /// Loads a product.
    fn product(&self, id: SourceId) -> CatalogResult<Option<ProductDetails>>;

    /// Loads a variation of `product_id`.
    fn variation(
        &self,
        product_id: SourceId,
        variation_id: SourceId,
    ) -> CatalogResult<Option<VariationDetails>>;

    /// Loads the bytes of an image.
    fn image(&self, image_id: SourceId) -> CatalogResult<Option<Vec<u8>>>;
}

impl<C: SourceCatalog + ?Sized> SourceCatalog for &C {
    fn list_categories(&self, parent: Option<SourceId>) -> CatalogResult<Vec<CategoryRecord>> {
        (**self).list_categories(parent)
    }

    fn default_category_id(&self) -> Option<SourceId> {
        (**self).default_category_id()
    }

    fn list_products(&self, limit: usize) -> CatalogResult<Vec<ProductRecord>> {
        (**self).list_products(limit)
    }

    fn get_variations(&self, product_id: SourceId) -> CatalogResult<Vec<VariationRecord>> {
        (**self).get_variations(product_id)
    }

    fn count_products(&self) -> CatalogResult<usize> {
        (**self).count_products()
    }

    fn category(&self, id: SourceId) -> CatalogResult<Option<CategoryDetails>> {
        (**self).category(id)
    }

    fn product(&self, id: SourceId) -> CatalogResult<Option<ProductDetails>> {
        (**self).product(id)
    }

    fn variation(
        &self,
        product_id: SourceId,
        variation_id: SourceId,
    ) -> CatalogResult<Option<VariationDetails>> {
        (**self).variation(product_id, variation_id)
    }

    fn image(&self, image_id: SourceId) -> CatalogResult<Option<Vec<u8>>> {
        (**self).image(image_id)
    }
}

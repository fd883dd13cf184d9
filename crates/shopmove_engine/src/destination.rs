//! The rate-limited destination store API.

use crate::catalog::SourceId;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Identifier of an entity at the destination.
pub type DestId = u64;

/// Result type for destination calls.
pub type DestinationResult<T> = Result<T, DestinationFault>;

/// Status the destination answers with when the plan's quota is exhausted.
pub const QUOTA_EXCEEDED_STATUS: u16 = 402;

/// A failed destination call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DestinationFault {
    /// The destination answered with an error status.
    #[error("{}", api_display(.status, .message))]
    Api {
        /// HTTP-like status code.
        status: u16,
        /// Machine-readable message, if the destination sent one.
        message: Option<String>,
    },

    /// No response was received.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A success response could not be understood.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

fn api_display(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("HTTP {status}"),
    }
}

impl DestinationFault {
    /// Creates an API fault.
    pub fn api(status: u16, message: Option<String>) -> Self {
        Self::Api { status, message }
    }

    /// Returns true if the fault means the plan's quota is exhausted.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == QUOTA_EXCEEDED_STATUS)
    }
}

/// A category to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    /// Display name.
    pub name: String,
    /// Description markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Destination parent, `None` for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DestId>,
}

/// A product to create or update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Display name.
    pub name: String,
    /// Stock keeping unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Description markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Base price.
    pub price: f64,
    /// Stock on hand; absent for unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// Whether the product is visible.
    pub enabled: bool,
    /// Destination categories.
    pub category_ids: Vec<DestId>,
}

/// A variation to create under a destination product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariation {
    /// Stock keeping unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Price override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Stock on hand; absent for unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// Option name to selected value.
    pub options: BTreeMap<String, String>,
}

/// Where an uploaded image attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTarget {
    /// A category's image.
    Category(DestId),
    /// A product's primary image.
    Product(DestId),
    /// A variation's image.
    Variation {
        /// Destination product.
        product: DestId,
        /// Destination variation.
        variation: DestId,
    },
    /// An additional gallery image, tagged with its source image.
    Gallery {
        /// Destination product.
        product: DestId,
        /// Source image id.
        source_image: SourceId,
    },
}

/// Write access to the destination store.
///
/// Implementations must not retry on their own; every fault is reported to
/// the engine, which decides what to do with it.
pub trait DestinationApi {
    /// Returns true if the destination plan allows categories.
    fn supports_categories(&self) -> DestinationResult<bool>;

    /// Returns the number of products at the destination.
    fn count_products(&self) -> DestinationResult<usize>;

    /// Returns the number of categories at the destination.
    fn count_categories(&self) -> DestinationResult<usize>;

    /// Returns the ids of demo products among the first `limit` products.
    fn list_demo_products(&self, limit: usize) -> DestinationResult<Vec<DestId>>;

    /// Creates a category.
    fn create_category(&self, category: &NewCategory) -> DestinationResult<DestId>;

    /// Creates a product.
    fn create_product(&self, product: &NewProduct) -> DestinationResult<DestId>;

    /// Finds an existing product by SKU.
    fn find_product_by_sku(&self, sku: &str) -> DestinationResult<Option<DestId>>;

    /// Overwrites an existing product.
    fn update_product(&self, id: DestId, product: &NewProduct) -> DestinationResult<()>;

    /// Creates a variation under `product`.
    fn create_variation(&self, product: DestId, variation: &NewVariation)
        -> DestinationResult<DestId>;

    /// Uploads image bytes to `target`.
    fn upload_image(&self, target: ImageTarget, bytes: &[u8]) -> DestinationResult<()>;

    /// Deletes products.
    fn delete_products(&self, ids: &[DestId]) -> DestinationResult<()>;
}

impl<D: DestinationApi + ?Sized> DestinationApi for &D {
    fn supports_categories(&self) -> DestinationResult<bool> {
        (**self).supports_categories()
    }

    fn count_products(&self) -> DestinationResult<usize> {
        (**self).count_products()
    }

    fn count_categories(&self) -> DestinationResult<usize> {
        (**self).count_categories()
    }

    fn list_demo_products(&self, limit: usize) -> DestinationResult<Vec<DestId>> {
        (**self).list_demo_products(limit)
    }

    fn create_category(&self, category: &NewCategory) -> DestinationResult<DestId> {
        (**self).create_category(category)
    }

    fn create_product(&self, product: &NewProduct) -> DestinationResult<DestId> {
        (**self).create_product(product)
    }

    fn find_product_by_sku(&self, sku: &str) -> DestinationResult<Option<DestId>> {
        (**self).find_product_by_sku(sku)
    }

    fn update_product(&self, id: DestId, product: &NewProduct) -> DestinationResult<()> {
        (**self).update_product(id, product)
    }

    fn create_variation(
        &self,
        product: DestId,
        variation: &NewVariation,
    ) -> DestinationResult<DestId> {
        (**self).create_variation(product, variation)
    }

    fn upload_image(&self, target: ImageTarget, bytes: &[u8]) -> DestinationResult<()> {
        (**self).upload_image(target, bytes)
    }

    fn delete_products(&self, ids: &[DestId]) -> DestinationResult<()> {
        (**self).delete_products(ids)
    }
}

//! In-crate fakes for unit tests.

use crate::catalog::{
    CatalogError, CatalogResult, CategoryDetails, CategoryRecord, ProductDetails, ProductRecord,
    SourceCatalog, SourceId, VariationDetails, VariationRecord,
};
use crate::destination::{
    DestId, DestinationApi, DestinationFault, DestinationResult, ImageTarget, NewCategory,
    NewProduct, NewVariation,
};
use crate::mapping::IdMapping;
use crate::settings::Settings;
use crate::task::{Task, TaskContext, TaskOutcome};
use parking_lot::Mutex;
use shopmove_storage::InMemoryStore;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

#[derive(Default)]
pub(crate) struct FakeCatalog {
    pub categories: BTreeMap<SourceId, (CategoryRecord, CategoryDetails)>,
    pub default_category: Option<SourceId>,
    pub products: BTreeMap<SourceId, (ProductRecord, ProductDetails)>,
    pub variations: BTreeMap<(SourceId, SourceId), (VariationRecord, VariationDetails)>,
    pub images: BTreeMap<SourceId, Vec<u8>>,
    pub broken: bool,
}

impl FakeCatalog {
    fn check(&self) -> CatalogResult<()> {
        if self.broken {
            Err(CatalogError::new("source database unavailable"))
        } else {
            Ok(())
        }
    }
}

impl SourceCatalog for FakeCatalog {
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

/// Records write calls as strings; reads report an empty destination.
#[derive(Default)]
pub(crate) struct FakeDestination {
    calls: Mutex<Vec<String>>,
    failures: Mutex<VecDeque<DestinationFault>>,
    skus: Mutex<BTreeMap<String, DestId>>,
    products: Mutex<Vec<NewProduct>>,
}

impl FakeDestination {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn fail_next(&self, fault: DestinationFault) {
        self.failures.lock().push_back(fault);
    }

    pub fn add_existing_sku(&self, sku: &str, id: DestId) {
        self.skus.lock().insert(sku.to_string(), id);
    }

    pub fn last_product(&self) -> Option<NewProduct> {
        self.products.lock().last().cloned()
    }

    /// Records `call` and returns the id the next created object gets.
    fn record(&self, call: String) -> DestinationResult<DestId> {
        let mut calls = self.calls.lock();
        calls.push(call);
        match self.failures.lock().pop_front() {
            Some(fault) => Err(fault),
            None => Ok(100 + calls.len() as DestId),
        }
    }
}

impl DestinationApi for FakeDestination {
    fn supports_categories(&self) -> DestinationResult<bool> {
        Ok(true)
    }

    fn count_products(&self) -> DestinationResult<usize> {
        Ok(0)
    }

    fn count_categories(&self) -> DestinationResult<usize> {
        Ok(0)
    }

    fn list_demo_products(&self, _limit: usize) -> DestinationResult<Vec<DestId>> {
        Ok(Vec::new())
    }

    fn create_category(&self, category: &NewCategory) -> DestinationResult<DestId> {
        self.record(format!(
            "create_category {} parent={:?}",
            category.name, category.parent_id
        ))
    }

    fn create_product(&self, product: &NewProduct) -> DestinationResult<DestId> {
        let id = self.record(format!("create_product {} sku={:?}", product.name, product.sku))?;
        self.products.lock().push(product.clone());
        Ok(id)
    }

    fn find_product_by_sku(&self, sku: &str) -> DestinationResult<Option<DestId>> {
        self.record(format!("find_product_by_sku {sku}"))?;
        Ok(self.skus.lock().get(sku).copied())
    }

    fn update_product(&self, id: DestId, product: &NewProduct) -> DestinationResult<()> {
        self.record(format!("update_product {id} {}", product.name))?;
        self.products.lock().push(product.clone());
        Ok(())
    }

    fn create_variation(
        &self,
        product: DestId,
        variation: &NewVariation,
    ) -> DestinationResult<DestId> {
        self.record(format!("create_variation {product} sku={:?}", variation.sku))
    }

    fn upload_image(&self, target: ImageTarget, bytes: &[u8]) -> DestinationResult<()> {
        self.record(format!("upload_image {target:?} {} bytes", bytes.len()))?;
        Ok(())
    }

    fn delete_products(&self, ids: &[DestId]) -> DestinationResult<()> {
        self.record(format!("delete_products {ids:?}"))?;
        Ok(())
    }
}

/// A catalog, a destination and a mapping wired into a task context.
pub(crate) struct Harness {
    pub catalog: FakeCatalog,
    pub destination: FakeDestination,
    pub mapping: IdMapping,
    pub settings: Settings,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            catalog: FakeCatalog::default(),
            destination: FakeDestination::default(),
            mapping: IdMapping::new(Arc::new(InMemoryStore::new()), "importer"),
            settings: Settings::default(),
        }
    }

    pub fn with_category(mut self, id: SourceId, name: &str, image: Option<SourceId>) -> Self {
        self.catalog.categories.insert(id, category(id, None, name, image));
        self
    }

    pub fn with_product(
        mut self,
        id: SourceId,
        name: &str,
        sku: Option<&str>,
        image: Option<SourceId>,
        category_ids: Vec<SourceId>,
    ) -> Self {
        let mut entry = product(id, image, vec![]);
        entry.1.name = name.to_string();
        entry.1.sku = sku.map(str::to_string);
        entry.1.category_ids = category_ids;
        self.catalog.products.insert(id, entry);
        self
    }

    pub fn with_variation(
        mut self,
        product_id: SourceId,
        variation_id: SourceId,
        image: Option<SourceId>,
    ) -> Self {
        self.catalog
            .variations
            .insert((product_id, variation_id), variation(variation_id, image));
        self
    }

    pub fn with_image(mut self, id: SourceId, bytes: &[u8]) -> Self {
        self.catalog.images.insert(id, bytes.to_vec());
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn run<T: Task>(&self, payload: &T::Payload) -> TaskOutcome {
        let ctx = TaskContext {
            catalog: &self.catalog,
            destination: &self.destination,
            mapping: &self.mapping,
            settings: &self.settings,
        };
        T::execute(&ctx, payload).unwrap()
    }
}

pub(crate) fn category(
    id: SourceId,
    parent_id: Option<SourceId>,
    name: &str,
    image: Option<SourceId>,
) -> (CategoryRecord, CategoryDetails) {
    (
        CategoryRecord {
            id,
            parent_id,
            has_image: image.is_some(),
        },
        CategoryDetails {
            name: name.to_string(),
            description: None,
            image_id: image,
        },
    )
}

pub(crate) fn product(
    id: SourceId,
    image: Option<SourceId>,
    gallery: Vec<SourceId>,
) -> (ProductRecord, ProductDetails) {
    (
        ProductRecord {
            id,
            image_id: image,
            gallery_image_ids: gallery,
            is_variable: false,
        },
        ProductDetails {
            name: format!("Product {id}"),
            sku: None,
            description: None,
            price: 10.0,
            quantity: None,
            enabled: true,
            category_ids: vec![],
            image_id: image,
        },
    )
}

pub(crate) fn variation(
    variation_id: SourceId,
    image: Option<SourceId>,
) -> (VariationRecord, VariationDetails) {
    (
        VariationRecord {
            variation_id,
            image_id: image,
        },
        VariationDetails {
            sku: Some(format!("VAR-{variation_id}")),
            price: None,
            quantity: None,
            options: BTreeMap::from([("Size".to_string(), "M".to_string())]),
            image_id: image,
        },
    )
}

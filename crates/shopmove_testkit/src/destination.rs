//! A recording, scriptable destination.

use parking_lot::Mutex;
use shopmove_engine::{
    DestId, DestinationApi, DestinationFault, DestinationResult, ImageTarget, NewCategory,
    NewProduct, NewVariation,
};
use std::collections::{BTreeMap, VecDeque};

/// Kinds of write calls, for scripting faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CallKind {
    /// `create_category`.
    CreateCategory,
    /// `create_product`.
    CreateProduct,
    /// `find_product_by_sku`.
    FindProductBySku,
    /// `update_product`.
    UpdateProduct,
    /// `create_variation`.
    CreateVariation,
    /// `upload_image`.
    UploadImage,
    /// `delete_products`.
    DeleteProducts,
}

/// A call the destination received.
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationCall {
    /// A category was created.
    CreateCategory(NewCategory),
    /// A product was created.
    CreateProduct(NewProduct),
    /// A product was looked up by SKU.
    FindProductBySku(String),
    /// A product was overwritten.
    UpdateProduct(DestId, NewProduct),
    /// A variation was created.
    CreateVariation(DestId, NewVariation),
    /// An image of the given size was uploaded.
    UploadImage(ImageTarget, usize),
    /// Products were deleted.
    DeleteProducts(Vec<DestId>),
}

impl DestinationCall {
    /// Returns the kind of the call.
    pub fn kind(&self) -> CallKind {
        match self {
            DestinationCall::CreateCategory(_) => CallKind::CreateCategory,
            DestinationCall::CreateProduct(_) => CallKind::CreateProduct,
            DestinationCall::FindProductBySku(_) => CallKind::FindProductBySku,
            DestinationCall::UpdateProduct(..) => CallKind::UpdateProduct,
            DestinationCall::CreateVariation(..) => CallKind::CreateVariation,
            DestinationCall::UploadImage(..) => CallKind::UploadImage,
            DestinationCall::DeleteProducts(_) => CallKind::DeleteProducts,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredProduct {
    sku: Option<String>,
    demo: bool,
}

#[derive(Debug)]
struct Inner {
    calls: Vec<DestinationCall>,
    next_faults: VecDeque<DestinationFault>,
    faults_at: BTreeMap<usize, DestinationFault>,
    standing_faults: BTreeMap<CallKind, DestinationFault>,
    products: BTreeMap<DestId, StoredProduct>,
    categories: usize,
    next_id: DestId,
}

/// A destination that records every write and can be told to fail.
///
/// Read calls (`count_*`, `list_demo_products`, `supports_categories`) are
/// not recorded and never fail.
#[derive(Debug)]
pub struct RecordingDestination {
    inner: Mutex<Inner>,
    categories_supported: bool,
}

impl RecordingDestination {
    /// Creates an empty destination that accepts categories.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                calls: Vec::new(),
                next_faults: VecDeque::new(),
                faults_at: BTreeMap::new(),
                standing_faults: BTreeMap::new(),
                products: BTreeMap::new(),
                categories: 0,
                next_id: 1000,
            }),
            categories_supported: true,
        }
    }

    /// Seeds `count` demo products.
    pub fn with_demo_products(self, count: usize) -> Self {
        self.seed(count, true);
        self
    }

    /// Seeds `count` regular products.
    pub fn with_products(self, count: usize) -> Self {
        self.seed(count, false);
        self
    }

    /// Seeds regular product `id` carrying `sku`.
    pub fn with_existing_sku(self, sku: &str, id: DestId) -> Self {
        self.inner.lock().products.insert(
            id,
            StoredProduct {
                sku: Some(sku.to_string()),
                demo: false,
            },
        );
        self
    }

    /// Reports categories as unsupported by the plan.
    pub fn without_categories(mut self) -> Self {
        self.categories_supported = false;
        self
    }

    /// Fails the next write call with `fault`.
    pub fn fail_next(&self, fault: DestinationFault) {
        self.inner.lock().next_faults.push_back(fault);
    }

    /// Fails the write call at `index` (0-based, counting every recorded
    /// call) with `fault`.
    pub fn fail_call(&self, index: usize, fault: DestinationFault) {
        self.inner.lock().faults_at.insert(index, fault);
    }

    /// Fails every call of `kind` with `fault`.
    pub fn fail_always(&self, kind: CallKind, fault: DestinationFault) {
        self.inner.lock().standing_faults.insert(kind, fault);
    }

    /// Stops failing calls of `kind`.
    pub fn heal(&self, kind: CallKind) {
        self.inner.lock().standing_faults.remove(&kind);
    }

    /// Returns every recorded write call.
    pub fn calls(&self) -> Vec<DestinationCall> {
        self.inner.lock().calls.clone()
    }

    /// Returns how many calls of `kind` were received.
    pub fn count(&self, kind: CallKind) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| call.kind() == kind)
            .count()
    }

    /// Returns the ids of every product held.
    pub fn product_ids(&self) -> Vec<DestId> {
        self.inner.lock().products.keys().copied().collect()
    }

    fn seed(&self, count: usize, demo: bool) {
        let mut inner = self.inner.lock();
        for _ in 0..count {
            inner.next_id += 1;
            let id = inner.next_id;
            inner.products.insert(id, StoredProduct { sku: None, demo });
        }
    }

    fn record(&self, call: DestinationCall) -> DestinationResult<()> {
        let mut inner = self.inner.lock();
        let kind = call.kind();
        let index = inner.calls.len();
        inner.calls.push(call);
        if let Some(fault) = inner.faults_at.remove(&index) {
            return Err(fault);
        }
        if let Some(fault) = inner.standing_faults.get(&kind) {
            return Err(fault.clone());
        }
        match inner.next_faults.pop_front() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn allocate(&self) -> DestId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        inner.next_id
    }
}

impl Default for RecordingDestination {
    fn default() -> Self {
        Self::new()
    }
}

impl DestinationApi for RecordingDestination {
    fn supports_categories(&self) -> DestinationResult<bool> {
        Ok(self.categories_supported)
    }

    fn count_products(&self) -> DestinationResult<usize> {
        Ok(self.inner.lock().products.len())
    }

    fn count_categories(&self) -> DestinationResult<usize> {
        Ok(self.inner.lock().categories)
    }

    fn list_demo_products(&self, limit: usize) -> DestinationResult<Vec<DestId>> {
        Ok(self
            .inner
            .lock()
            .products
            .iter()
            .take(limit)
            .filter(|(_, product)| product.demo)
            .map(|(id, _)| *id)
            .collect())
    }

    fn create_category(&self, category: &NewCategory) -> DestinationResult<DestId> {
        self.record(DestinationCall::CreateCategory(category.clone()))?;
        self.inner.lock().categories += 1;
        Ok(self.allocate())
    }

    fn create_product(&self, product: &NewProduct) -> DestinationResult<DestId> {
        self.record(DestinationCall::CreateProduct(product.clone()))?;
        let id = self.allocate();
        self.inner.lock().products.insert(
            id,
            StoredProduct {
                sku: product.sku.clone(),
                demo: false,
            },
        );
        Ok(id)
    }

    fn find_product_by_sku(&self, sku: &str) -> DestinationResult<Option<DestId>> {
        self.record(DestinationCall::FindProductBySku(sku.to_string()))?;
        Ok(self
            .inner
            .lock()
            .products
            .iter()
            .find(|(_, product)| product.sku.as_deref() == Some(sku))
            .map(|(id, _)| *id))
    }

    fn update_product(&self, id: DestId, product: &NewProduct) -> DestinationResult<()> {
        self.record(DestinationCall::UpdateProduct(id, product.clone()))?;
        match self.inner.lock().products.get_mut(&id) {
            Some(stored) => {
                stored.sku = product.sku.clone();
                Ok(())
            }
            None => Err(DestinationFault::api(404, Some(format!("product {id} not found")))),
        }
    }

    fn create_variation(
        &self,
        product: DestId,
        variation: &NewVariation,
    ) -> DestinationResult<DestId> {
        self.record(DestinationCall::CreateVariation(product, variation.clone()))?;
        Ok(self.allocate())
    }

    fn upload_image(&self, target: ImageTarget, bytes: &[u8]) -> DestinationResult<()> {
        self.record(DestinationCall::UploadImage(target, bytes.len()))
    }

    fn delete_products(&self, ids: &[DestId]) -> DestinationResult<()> {
        self.record(DestinationCall::DeleteProducts(ids.to_vec()))?;
        let mut inner = self.inner.lock();
        for id in ids {
            inner.products.remove(id);
        }
        Ok(())
    }
}

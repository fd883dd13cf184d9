//! Source-to-destination id mapping.

use crate::catalog::SourceId;
use crate::destination::DestId;
use crate::error::MigrationResult;
use shopmove_storage::{KvStore, TypedStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Persistent map from source ids to destination ids.
///
/// Every save is written through to the store immediately so a crash after
/// a destination create never loses the new id. Create tasks consult the
/// mapping first and skip work that is already done.
pub struct IdMapping {
    store: Arc<dyn KvStore>,
    categories_key: String,
    products_key: String,
    variations_key: String,
}

impl IdMapping {
    /// Creates a mapping whose keys start with `prefix`.
    pub fn new(store: Arc<dyn KvStore>, prefix: &str) -> Self {
        Self {
            store,
            categories_key: format!("{prefix}.categories"),
            products_key: format!("{prefix}.products"),
            variations_key: format!("{prefix}.variations"),
        }
    }

    /// Returns the destination id of a source category.
    pub fn get_mapped_category_id(&self, source: SourceId) -> MigrationResult<Option<DestId>> {
        Ok(self.categories()?.get(&source).copied())
    }

    /// Records the destination id of a source category.
    pub fn save_mapped_category_id(&self, source: SourceId, dest: DestId) -> MigrationResult<()> {
        self.insert(&self.categories_key, source, dest)
    }

    /// Returns the destination id of a source product.
    pub fn get_mapped_product_id(&self, source: SourceId) -> MigrationResult<Option<DestId>> {
        Ok(self.products()?.get(&source).copied())
    }

    /// Records the destination id of a source product.
    pub fn save_mapped_product_id(&self, source: SourceId, dest: DestId) -> MigrationResult<()> {
        self.insert(&self.products_key, source, dest)
    }

    /// Returns the destination id of a source variation.
    pub fn get_mapped_variation_id(
        &self,
        product: SourceId,
        variation: SourceId,
    ) -> MigrationResult<Option<DestId>> {
        let map: BTreeMap<String, DestId> = self.store.get_or(&self.variations_key, BTreeMap::new())?;
        Ok(map.get(&variation_key(product, variation)).copied())
    }

    /// Records the destination id of a source variation.
    pub fn save_mapped_variation_id(
        &self,
        product: SourceId,
        variation: SourceId,
        dest: DestId,
    ) -> MigrationResult<()> {
        let mut map: BTreeMap<String, DestId> =
            self.store.get_or(&self.variations_key, BTreeMap::new())?;
        map.insert(variation_key(product, variation), dest);
        self.store.set_value(&self.variations_key, &map)?;
        Ok(())
    }

    /// Returns every mapped category.
    pub fn categories(&self) -> MigrationResult<BTreeMap<SourceId, DestId>> {
        Ok(self.store.get_or(&self.categories_key, BTreeMap::new())?)
    }

    /// Returns every mapped product.
    pub fn products(&self) -> MigrationResult<BTreeMap<SourceId, DestId>> {
        Ok(self.store.get_or(&self.products_key, BTreeMap::new())?)
    }

    /// Forgets every mapping.
    pub fn clear(&self) -> MigrationResult<()> {
        self.store.remove(&self.categories_key)?;
        self.store.remove(&self.products_key)?;
        self.store.remove(&self.variations_key)?;
        Ok(())
    }

    fn insert(&self, key: &str, source: SourceId, dest: DestId) -> MigrationResult<()> {
        let mut map: BTreeMap<SourceId, DestId> = self.store.get_or(key, BTreeMap::new())?;
        map.insert(source, dest);
        self.store.set_value(key, &map)?;
        Ok(())
    }
}

fn variation_key(product: SourceId, variation: SourceId) -> String {
    format!("{product}:{variation}")
}

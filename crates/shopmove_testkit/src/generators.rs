//! Property-based test generators using proptest.

use crate::catalog::{CatalogBuilder, MemoryCatalog};
use proptest::prelude::*;
use proptest::sample::Index;
use shopmove_engine::SourceId;

/// Where a generated variation's image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationImage {
    /// No image.
    None,
    /// The product's primary image.
    SameAsProduct,
    /// An image of its own.
    Own,
}

fn variation_image_strategy() -> impl Strategy<Value = VariationImage> {
    prop_oneof![
        Just(VariationImage::None),
        Just(VariationImage::SameAsProduct),
        Just(VariationImage::Own),
    ]
}

/// Strategy for category forests.
///
/// Category `i` (1-based) is either a root or a child of some category
/// below `i`, so parents always exist. Yields `(id, parent, has_image)`
/// triples and an optional default category id.
pub fn category_tree_strategy(
) -> impl Strategy<Value = (Vec<(SourceId, Option<SourceId>, bool)>, Option<SourceId>)> {
    prop::collection::vec((any::<bool>(), any::<Index>(), any::<bool>()), 0..12).prop_flat_map(
        |nodes| {
            let count = nodes.len();
            let tree: Vec<_> = nodes
                .into_iter()
                .enumerate()
                .map(|(i, (is_child, parent, has_image))| {
                    let id = i as SourceId + 1;
                    let parent = (is_child && i > 0).then(|| parent.index(i) as SourceId + 1);
                    (id, parent, has_image)
                })
                .collect();
            let default = if count == 0 {
                Just(None).boxed()
            } else {
                prop::option::of(1..=count as SourceId).boxed()
            };
            (Just(tree), default)
        },
    )
}

/// A generated product: primary image, gallery size and variation images.
pub type ProductShape = (bool, usize, Vec<VariationImage>);

/// Strategy for product shapes.
pub fn product_strategy() -> impl Strategy<Value = ProductShape> {
    (
        any::<bool>(),
        0usize..3,
        prop::collection::vec(variation_image_strategy(), 0..4),
    )
}

/// Strategy for whole catalogs with categories, products, variations and
/// images.
pub fn catalog_strategy() -> impl Strategy<Value = MemoryCatalog> {
    (
        category_tree_strategy(),
        prop::collection::vec(product_strategy(), 0..10),
    )
        .prop_map(|((categories, default), products)| build_catalog(&categories, default, &products))
}

/// Builds a catalog from generated shapes.
///
/// Image ids are allocated from 10_000 upward so they never collide with
/// entity ids.
pub fn build_catalog(
    categories: &[(SourceId, Option<SourceId>, bool)],
    default: Option<SourceId>,
    products: &[ProductShape],
) -> MemoryCatalog {
    let mut next_image: SourceId = 10_000;
    let mut image = || {
        next_image += 1;
        next_image
    };

    let mut builder: CatalogBuilder = MemoryCatalog::builder();
    for (id, parent, has_image) in categories {
        let image_id = has_image.then(&mut image);
        builder = builder.category(*id, *parent, &format!("Category {id}"), image_id);
    }
    if let Some(id) = default {
        builder = builder.default_category(id);
    }

    for (i, (has_image, gallery, variations)) in products.iter().enumerate() {
        let id = i as SourceId + 1;
        let primary = has_image.then(&mut image);
        builder = builder.product(id, &format!("Product {id}"), None, primary, &[]);

        let gallery_ids: Vec<SourceId> = (0..*gallery).map(|_| image()).collect();
        builder = builder.gallery(id, &gallery_ids);

        for (v, source) in variations.iter().enumerate() {
            let image_id = match source {
                VariationImage::None => None,
                VariationImage::SameAsProduct => primary,
                VariationImage::Own => Some(image()),
            };
            builder = builder.variation(id, v as SourceId + 1, image_id);
        }
    }
    builder.build()
}

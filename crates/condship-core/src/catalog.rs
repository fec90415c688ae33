use std::collections::HashMap;

use crate::package::{ProductId, ProductKind};

/// Store-side lookups the evaluator needs but does not own.
///
/// Every method has a neutral default so a store without variations,
/// translations or multiple currencies can use [`IdentityCatalog`].
pub trait Catalog: Send + Sync {
    /// Variations (or other children) of a configured product.
    fn child_product_ids(&self, _parent: ProductId) -> Vec<ProductId> {
        Vec::new()
    }

    /// Map a possibly translated product id to its default-language id.
    fn canonical_product_id(&self, id: ProductId, _kind: ProductKind) -> ProductId {
        id
    }

    /// Convert a configured amount from the base currency to the active one.
    fn convert_price(&self, amount: f64) -> f64 {
        amount
    }
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn child_product_ids(&self, parent: ProductId) -> Vec<ProductId> {
        (**self).child_product_ids(parent)
    }

    fn canonical_product_id(&self, id: ProductId, kind: ProductKind) -> ProductId {
        (**self).canonical_product_id(id, kind)
    }

    fn convert_price(&self, amount: f64) -> f64 {
        (**self).convert_price(amount)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCatalog;

impl Catalog for IdentityCatalog {}

/// Table-driven catalog, handy for embedding hosts that preload their data.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    children: HashMap<ProductId, Vec<ProductId>>,
    canonical: HashMap<ProductId, ProductId>,
    exchange_rate: f64,
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            canonical: HashMap::new(),
            exchange_rate: 1.0,
        }
    }
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(mut self, parent: ProductId, children: Vec<ProductId>) -> Self {
        self.children.entry(parent).or_default().extend(children);
        self
    }

    pub fn with_translation(mut self, translated: ProductId, canonical: ProductId) -> Self {
        self.canonical.insert(translated, canonical);
        self
    }

    pub fn with_exchange_rate(mut self, rate: f64) -> Self {
        self.exchange_rate = rate;
        self
    }
}

impl Catalog for StaticCatalog {
    fn child_product_ids(&self, parent: ProductId) -> Vec<ProductId> {
        self.children.get(&parent).cloned().unwrap_or_default()
    }

    fn canonical_product_id(&self, id: ProductId, _kind: ProductKind) -> ProductId {
        self.canonical.get(&id).copied().unwrap_or(id)
    }

    fn convert_price(&self, amount: f64) -> f64 {
        amount * self.exchange_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_catalog_is_neutral() {
        let catalog = IdentityCatalog;
        assert!(catalog.child_product_ids(1).is_empty());
        assert_eq!(catalog.canonical_product_id(7, ProductKind::Variation), 7);
        assert_eq!(catalog.convert_price(12.5), 12.5);
    }

    #[test]
    fn static_catalog_lookups() {
        let catalog = StaticCatalog::new()
            .with_children(10, vec![11, 12])
            .with_translation(110, 10)
            .with_exchange_rate(2.0);

        assert_eq!(catalog.child_product_ids(10), vec![11, 12]);
        assert!(catalog.child_product_ids(20).is_empty());
        assert_eq!(catalog.canonical_product_id(110, ProductKind::Product), 10);
        assert_eq!(catalog.canonical_product_id(5, ProductKind::Product), 5);
        assert_eq!(catalog.convert_price(3.0), 6.0);
    }
}

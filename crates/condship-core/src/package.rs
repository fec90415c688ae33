//! Read-only snapshot of a cart or order handed to the rule engine.

use serde::{Deserialize, Serialize};

pub type ProductId = u64;
pub type ShippingClassId = u64;

/// Whether an id refers to a parent product or one of its variations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Product,
    Variation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub product_id: ProductId,
    #[serde(default)]
    pub variation_id: Option<ProductId>,
    pub quantity: u32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub shipping_class_id: Option<ShippingClassId>,
    #[serde(default)]
    pub on_sale: Option<bool>,
    #[serde(default)]
    pub line_total: f64,
    #[serde(default)]
    pub line_tax: f64,
    #[serde(default)]
    pub line_subtotal: f64,
    #[serde(default)]
    pub line_subtotal_tax: f64,
    #[serde(default = "default_needs_shipping")]
    pub needs_shipping: bool,
}

fn default_needs_shipping() -> bool {
    true
}

impl Item {
    /// A shippable item with no dimensions, weight or pricing set.
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            variation_id: None,
            quantity,
            weight: None,
            length: None,
            width: None,
            height: None,
            shipping_class_id: None,
            on_sale: None,
            line_total: 0.0,
            line_tax: 0.0,
            line_subtotal: 0.0,
            line_subtotal_tax: 0.0,
            needs_shipping: true,
        }
    }

    /// The id used for product-set comparisons: the variation when there is
    /// one, otherwise the product itself.
    pub fn observed_product(&self) -> (ProductId, ProductKind) {
        match self.variation_id {
            Some(variation) if variation != 0 => (variation, ProductKind::Variation),
            _ => (self.product_id, ProductKind::Product),
        }
    }

    pub fn has_dimensions(&self) -> bool {
        self.length.is_some() || self.width.is_some() || self.height.is_some()
    }
}

/// Items plus the order-level totals computed by checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub items: Vec<Item>,
    #[serde(default)]
    pub displayed_subtotal: f64,
    #[serde(default)]
    pub discount_total: f64,
    #[serde(default)]
    pub discount_tax: f64,
    #[serde(default)]
    pub prices_include_tax: bool,
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,
}

fn default_price_decimals() -> u32 {
    2
}

impl Package {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            displayed_subtotal: 0.0,
            discount_total: 0.0,
            discount_tax: 0.0,
            prices_include_tax: false,
            price_decimals: default_price_decimals(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn displayed_subtotal(&self) -> f64 {
        self.displayed_subtotal
    }

    pub fn discount_total(&self) -> f64 {
        self.discount_total
    }

    pub fn discount_tax(&self) -> f64 {
        self.discount_tax
    }

    pub fn displays_prices_including_tax(&self) -> bool {
        self.prices_include_tax
    }

    pub fn price_decimal_precision(&self) -> u32 {
        self.price_decimals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_product_prefers_variation() {
        let mut item = Item::new(10, 1);
        assert_eq!(item.observed_product(), (10, ProductKind::Product));

        item.variation_id = Some(11);
        assert_eq!(item.observed_product(), (11, ProductKind::Variation));

        item.variation_id = Some(0);
        assert_eq!(item.observed_product(), (10, ProductKind::Product));
    }

    #[test]
    fn package_deserializes_with_defaults() {
        let json = serde_json::json!({
            "items": [{ "product_id": 5, "quantity": 2, "weight": 1.5 }]
        });
        let package: Package = serde_json::from_value(json).expect("package");
        assert_eq!(package.price_decimals, 2);
        assert!(!package.prices_include_tax);
        let item = &package.items[0];
        assert!(item.needs_shipping);
        assert_eq!(item.weight, Some(1.5));
        assert!(!item.has_dimensions());
    }
}

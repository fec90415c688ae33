use std::fmt;

use crate::package::{Item, ShippingClassId};

const SHIPPING_CLASS_NOT_PREFIX: &str = "shipping_class_not_";
const SHIPPING_CLASS_PREFIX: &str = "shipping_class_";
const SALE_PRODUCTS: &str = "sale_products";
const NON_SALE_PRODUCTS: &str = "non_sale_products";

/// Narrows an aggregation to part of the cart.
///
/// Items whose shipping class or sale status is unknown never belong to a
/// class- or sale-based subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetFilter {
    ShippingClass(ShippingClassId),
    NotShippingClass(ShippingClassId),
    SaleProducts,
    NonSaleProducts,
}

impl SubsetFilter {
    pub fn parse(tag: &str) -> Option<Self> {
        if let Some(id) = tag.strip_prefix(SHIPPING_CLASS_NOT_PREFIX) {
            return id.parse().ok().map(Self::NotShippingClass);
        }
        if let Some(id) = tag.strip_prefix(SHIPPING_CLASS_PREFIX) {
            return id.parse().ok().map(Self::ShippingClass);
        }
        match tag {
            SALE_PRODUCTS => Some(Self::SaleProducts),
            NON_SALE_PRODUCTS => Some(Self::NonSaleProducts),
            _ => None,
        }
    }

    pub fn contains(&self, item: &Item) -> bool {
        match self {
            SubsetFilter::ShippingClass(id) => item.shipping_class_id == Some(*id),
            SubsetFilter::NotShippingClass(id) => {
                matches!(item.shipping_class_id, Some(class) if class != *id)
            }
            SubsetFilter::SaleProducts => item.on_sale == Some(true),
            SubsetFilter::NonSaleProducts => item.on_sale == Some(false),
        }
    }

    pub fn apply<'a>(&self, items: &'a [Item]) -> impl Iterator<Item = &'a Item> {
        let filter = *self;
        items.iter().filter(move |item| filter.contains(item))
    }
}

impl fmt::Display for SubsetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubsetFilter::ShippingClass(id) => write!(f, "{SHIPPING_CLASS_PREFIX}{id}"),
            SubsetFilter::NotShippingClass(id) => write!(f, "{SHIPPING_CLASS_NOT_PREFIX}{id}"),
            SubsetFilter::SaleProducts => f.write_str(SALE_PRODUCTS),
            SubsetFilter::NonSaleProducts => f.write_str(NON_SALE_PRODUCTS),
        }
    }
}

/// Tag-level membership test. Unrecognised tags select nothing.
pub fn in_subset(item: &Item, tag: &str) -> bool {
    match SubsetFilter::parse(tag) {
        Some(filter) => filter.contains(item),
        None => {
            tracing::warn!(tag, "unrecognized subset filter");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with_class(class: Option<ShippingClassId>) -> Item {
        let mut item = Item::new(1, 1);
        item.shipping_class_id = class;
        item
    }

    fn item_on_sale(on_sale: Option<bool>) -> Item {
        let mut item = Item::new(1, 1);
        item.on_sale = on_sale;
        item
    }

    #[test]
    fn parses_known_tags() {
        assert_eq!(
            SubsetFilter::parse("shipping_class_5"),
            Some(SubsetFilter::ShippingClass(5))
        );
        assert_eq!(
            SubsetFilter::parse("shipping_class_not_5"),
            Some(SubsetFilter::NotShippingClass(5))
        );
        assert_eq!(
            SubsetFilter::parse("sale_products"),
            Some(SubsetFilter::SaleProducts)
        );
        assert_eq!(
            SubsetFilter::parse("non_sale_products"),
            Some(SubsetFilter::NonSaleProducts)
        );
    }

    #[test]
    fn rejects_unknown_tags() {
        assert_eq!(SubsetFilter::parse("featured_products"), None);
        assert_eq!(SubsetFilter::parse("shipping_class_"), None);
        assert_eq!(SubsetFilter::parse("shipping_class_bulky"), None);
        assert_eq!(SubsetFilter::parse(""), None);
    }

    #[test]
    fn display_matches_tag_grammar() {
        for tag in [
            "shipping_class_12",
            "shipping_class_not_3",
            "sale_products",
            "non_sale_products",
        ] {
            let filter = SubsetFilter::parse(tag).expect("known tag");
            assert_eq!(filter.to_string(), tag);
        }
    }

    #[test]
    fn shipping_class_selects_exact_class() {
        assert!(in_subset(&item_with_class(Some(5)), "shipping_class_5"));
        assert!(!in_subset(&item_with_class(Some(6)), "shipping_class_5"));
        assert!(!in_subset(&item_with_class(None), "shipping_class_5"));
    }

    #[test]
    fn shipping_class_not_requires_known_class() {
        assert!(in_subset(&item_with_class(Some(6)), "shipping_class_not_5"));
        assert!(!in_subset(&item_with_class(Some(5)), "shipping_class_not_5"));
        assert!(!in_subset(&item_with_class(None), "shipping_class_not_5"));
    }

    #[test]
    fn sale_filters_require_known_status() {
        assert!(in_subset(&item_on_sale(Some(true)), "sale_products"));
        assert!(!in_subset(&item_on_sale(Some(false)), "sale_products"));
        assert!(!in_subset(&item_on_sale(None), "sale_products"));

        assert!(in_subset(&item_on_sale(Some(false)), "non_sale_products"));
        assert!(!in_subset(&item_on_sale(Some(true)), "non_sale_products"));
        assert!(!in_subset(&item_on_sale(None), "non_sale_products"));
    }

    #[test]
    fn unknown_tag_excludes_everything() {
        assert!(!in_subset(&item_on_sale(Some(true)), "everything"));
        assert!(!in_subset(&item_with_class(Some(5)), "class_5"));
    }

    #[test]
    fn apply_only_narrows() {
        let items = vec![
            item_with_class(Some(5)),
            item_with_class(Some(7)),
            item_with_class(None),
        ];
        let selected: Vec<_> = SubsetFilter::ShippingClass(5).apply(&items).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].shipping_class_id, Some(5));
    }
}

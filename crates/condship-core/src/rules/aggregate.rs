//! Package metrics summed over the whole cart or over a subset of it.
//!
//! Items that do not need shipping never contribute to physical metrics.
//! Missing dimensions or weight count as zero rather than as an error.

use crate::package::{Item, Package};

use super::subset::SubsetFilter;

/// Items of the package that take part in an aggregation.
pub fn scoped_items<'a>(
    package: &'a Package,
    subset: Option<&'a SubsetFilter>,
) -> impl Iterator<Item = &'a Item> + 'a {
    package
        .items()
        .iter()
        .filter(move |item| subset.is_none_or(|filter| filter.contains(item)))
}

fn quantity(item: &Item) -> f64 {
    f64::from(item.quantity)
}

pub fn weight<'a>(items: impl IntoIterator<Item = &'a Item>) -> f64 {
    items
        .into_iter()
        .filter(|item| item.needs_shipping)
        .map(|item| item.weight.unwrap_or(0.0) * quantity(item))
        .sum()
}

pub fn volume<'a>(items: impl IntoIterator<Item = &'a Item>) -> f64 {
    items
        .into_iter()
        .filter(|item| item.needs_shipping)
        .filter_map(|item| match (item.length, item.width, item.height) {
            (Some(length), Some(width), Some(height)) => {
                Some(length * width * height * quantity(item))
            }
            _ => None,
        })
        .sum()
}

fn dimension_total<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    dimension: impl Fn(&Item) -> Option<f64>,
) -> f64 {
    items
        .into_iter()
        .filter(|item| item.needs_shipping && item.has_dimensions())
        .map(|item| dimension(item).unwrap_or(0.0) * quantity(item))
        .sum()
}

pub fn height<'a>(items: impl IntoIterator<Item = &'a Item>) -> f64 {
    dimension_total(items, |item| item.height)
}

pub fn length<'a>(items: impl IntoIterator<Item = &'a Item>) -> f64 {
    dimension_total(items, |item| item.length)
}

pub fn width<'a>(items: impl IntoIterator<Item = &'a Item>) -> f64 {
    dimension_total(items, |item| item.width)
}

/// Cart subtotal as seen by a subtotal condition.
///
/// With a subset filter the subtotal is rebuilt from line totals: the
/// coupon-adjusted `line_total` when `includes_coupons` is set, the raw
/// `line_subtotal` otherwise, each with its tax only when prices are displayed
/// tax-inclusive. The subset result is not rounded.
///
/// Without a subset filter the displayed subtotal is used and, when
/// `includes_coupons` is *not* set, the discount total (plus discount tax for
/// tax-inclusive display) is taken off. That result is rounded to the
/// package's price precision.
pub fn subtotal(
    package: &Package,
    subset: Option<&SubsetFilter>,
    includes_coupons: bool,
) -> f64 {
    let incl_tax = package.displays_prices_including_tax();

    if let Some(filter) = subset {
        return scoped_items(package, Some(filter))
            .map(|item| {
                let (amount, tax) = if includes_coupons {
                    (item.line_total, item.line_tax)
                } else {
                    (item.line_subtotal, item.line_subtotal_tax)
                };
                if incl_tax { amount + tax } else { amount }
            })
            .sum();
    }

    let mut total = package.displayed_subtotal();
    if !includes_coupons {
        total -= package.discount_total();
        if incl_tax {
            total -= package.discount_tax();
        }
    }

    round_to(total, package.price_decimal_precision())
}

/// Round half away from zero. The scaled value is first cut to 15 significant
/// digits so representation error cannot pull a half-way amount such as 1.005
/// below the midpoint.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(15) as i32);
    let scaled = value * factor;
    if scaled == 0.0 || !scaled.is_finite() {
        return value;
    }

    let precision = 14 - scaled.abs().log10().floor() as i32;
    let scaled = if (0..=22).contains(&precision) {
        let digits = 10f64.powi(precision);
        (scaled * digits).round() / digits
    } else {
        scaled
    };

    scaled.round() / factor
}

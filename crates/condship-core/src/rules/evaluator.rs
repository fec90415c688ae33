use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::catalog::{Catalog, IdentityCatalog};
use crate::package::{Package, ProductId};

use super::aggregate::{self, scoped_items};
use super::conditions::{Condition, Measure, Predicate};
use super::operators::{ComparisonError, compare, group_compare, parse_number};
use super::types::{Action, Ruleset, RulesetOperator};

/// Threshold used when a weight condition has no value. Weights are never
/// negative, so comparing against zero reproduces the legacy comparison
/// against a boolean `false`.
pub const EMPTY_WEIGHT_SENTINEL: f64 = 0.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionOutcome {
    pub guid: Option<String>,
    pub condition_type: &'static str,
    pub blocks_shipping: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulesetOutcome {
    pub ruleset_id: String,
    pub operator: RulesetOperator,
    pub conditions: Vec<ConditionOutcome>,
    pub matched: bool,
}

/// Stateless evaluation service. The only thing it holds is the catalog
/// collaborator used for product and price lookups.
#[derive(Debug, Clone, Default)]
pub struct Evaluator<C = IdentityCatalog> {
    catalog: C,
}

impl<C: Catalog> Evaluator<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Raw comparison of the package against the condition.
    ///
    /// `Ok(None)` means the condition cannot be evaluated (no value, no
    /// configured products, or no products in the cart).
    pub fn condition_matches(
        &self,
        condition: &Condition,
        package: &Package,
    ) -> Result<Option<bool>, ComparisonError> {
        let subset = condition.subset.as_ref();

        match &condition.predicate {
            Predicate::Measure { measure, op, value } => {
                let is_weight = *measure == Measure::Weight;
                let raw = if is_weight {
                    non_empty(value)
                } else {
                    configured_value(value)
                };
                let threshold = match raw {
                    Some(raw) => parse_number(raw)?,
                    None if is_weight => EMPTY_WEIGHT_SENTINEL,
                    None => return Ok(None),
                };
                let items = scoped_items(package, subset);
                let total = match measure {
                    Measure::Weight => aggregate::weight(items),
                    Measure::Height => aggregate::height(items),
                    Measure::Length => aggregate::length(items),
                    Measure::Width => aggregate::width(items),
                    Measure::Volume => aggregate::volume(items),
                };
                Ok(Some(compare(total, threshold, *op)))
            }
            Predicate::Subtotal {
                op,
                value,
                includes_coupons,
            } => {
                let Some(raw) = configured_value(value) else {
                    return Ok(None);
                };
                let threshold = self.catalog.convert_price(parse_number(raw)?);
                let total = aggregate::subtotal(package, subset, *includes_coupons);
                Ok(Some(compare(total, threshold, *op)))
            }
            Predicate::Products { op, product_ids } => {
                if product_ids.is_empty() {
                    return Ok(None);
                }
                let configured = self.with_children(product_ids);
                let observed = self.observed_products(package);
                if observed.is_empty() {
                    return Ok(None);
                }
                Ok(Some(group_compare(observed, configured, *op)))
            }
        }
    }

    /// Whether this condition removes shipping for the package.
    ///
    /// This is the inverse of [`Self::condition_matches`]: a condition blocks
    /// shipping when the package does *not* satisfy the configured comparison.
    /// Conditions that cannot be evaluated, or whose value fails to parse,
    /// never block.
    pub fn blocks_shipping(&self, condition: &Condition, package: &Package) -> bool {
        match self.condition_matches(condition, package) {
            Ok(Some(matched)) => !matched,
            Ok(None) => false,
            Err(err) => {
                warn!(
                    condition_guid = condition.guid.as_deref().unwrap_or_default(),
                    condition_type = condition.type_name(),
                    error = %err,
                    "condition evaluation failed"
                );
                false
            }
        }
    }

    pub fn evaluate(&self, ruleset: &Ruleset, package: &Package) -> bool {
        if ruleset.conditions.is_empty() {
            warn!(ruleset_id = %ruleset.id, "ruleset has no conditions");
            return false;
        }

        let mut verdicts = ruleset
            .conditions
            .iter()
            .map(|condition| self.blocks_shipping(condition, package));

        match ruleset.operator {
            RulesetOperator::And => verdicts.all(|blocks| blocks),
            RulesetOperator::Or => verdicts.any(|blocks| blocks),
        }
    }

    /// Like [`Self::evaluate`] but records every condition's verdict.
    pub fn evaluate_with_trace(&self, ruleset: &Ruleset, package: &Package) -> RulesetOutcome {
        let conditions: Vec<ConditionOutcome> = ruleset
            .conditions
            .iter()
            .map(|condition| ConditionOutcome {
                guid: condition.guid.clone(),
                condition_type: condition.type_name(),
                blocks_shipping: self.blocks_shipping(condition, package),
            })
            .collect();

        let matched = !conditions.is_empty()
            && match ruleset.operator {
                RulesetOperator::And => conditions.iter().all(|c| c.blocks_shipping),
                RulesetOperator::Or => conditions.iter().any(|c| c.blocks_shipping),
            };

        RulesetOutcome {
            ruleset_id: ruleset.id.clone(),
            operator: ruleset.operator,
            conditions,
            matched,
        }
    }

    /// Actions of every enabled ruleset that matches, in ruleset order.
    pub fn matched_actions(&self, rulesets: &[Ruleset], package: &Package) -> Vec<Action> {
        rulesets
            .iter()
            .filter(|ruleset| ruleset.enabled)
            .filter(|ruleset| self.evaluate(ruleset, package))
            .flat_map(|ruleset| ruleset.actions.iter().cloned())
            .collect()
    }

    /// Every product id in the cart, plus the canonical id of each one.
    /// Subset filters do not apply to product conditions.
    fn observed_products(&self, package: &Package) -> BTreeSet<ProductId> {
        let mut observed = BTreeSet::new();
        for item in package.items() {
            let (id, kind) = item.observed_product();
            observed.insert(id);
            observed.insert(self.catalog.canonical_product_id(id, kind));
        }
        observed
    }

    fn with_children(&self, product_ids: &[ProductId]) -> BTreeSet<ProductId> {
        let mut ids: BTreeSet<ProductId> = product_ids.iter().copied().collect();
        for parent in product_ids {
            ids.extend(self.catalog.child_product_ids(*parent));
        }
        ids
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|raw| !raw.is_empty())
}

/// Threshold of a dimension, volume or subtotal condition. A stored `"0"`
/// counts as unset, so those conditions never block.
fn configured_value(value: &Option<String>) -> Option<&str> {
    non_empty(value).filter(|raw| *raw != "0")
}

pub fn evaluate(ruleset: &Ruleset, package: &Package) -> bool {
    Evaluator::new(IdentityCatalog).evaluate(ruleset, package)
}

pub fn matched_actions(rulesets: &[Ruleset], package: &Package) -> Vec<Action> {
    Evaluator::new(IdentityCatalog).matched_actions(rulesets, package)
}

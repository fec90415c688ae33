//! Configuration checks run over stored rulesets.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use super::types::RulesetRecord;

pub const ENABLE_SHIPPING_METHODS: &str = "enable_shipping_methods";

/// Shipping methods that more than one enabled ruleset tries to restrict to.
///
/// Each of those rulesets hides every other method, so when two of them match
/// at once the customer is often left with nothing. Returns method id to the
/// ids of the rulesets that enable it.
pub fn overlapping_enables(records: &[RulesetRecord]) -> BTreeMap<String, Vec<String>> {
    let mut by_method: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for record in records.iter().filter(|record| record.enabled) {
        let method_ids = record
            .actions
            .iter()
            .filter(|action| action.action_type == ENABLE_SHIPPING_METHODS)
            .filter_map(|action| action.fields.get("shipping_method_ids"))
            .flat_map(parse_method_ids);

        for method_id in method_ids {
            let rulesets = by_method.entry(method_id).or_default();
            if !rulesets.contains(&record.id) {
                rulesets.push(record.id.clone());
            }
        }
    }

    by_method.retain(|method_id, rulesets| {
        let overlapping = rulesets.len() > 1;
        if overlapping {
            warn!(%method_id, rulesets = ?rulesets, "shipping method enabled by several rulesets");
        }
        overlapping
    });
    by_method
}

fn parse_method_ids(value: &Value) -> Vec<String> {
    match value {
        Value::Array(ids) => ids
            .iter()
            .filter_map(|id| match id {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

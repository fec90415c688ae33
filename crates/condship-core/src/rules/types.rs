use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::conditions::{Condition, ConditionError, ConditionRecord, parse_condition};
use super::operators::ComparisonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesetOperator {
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
}

impl RulesetOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RulesetOperator::And => "and",
            RulesetOperator::Or => "or",
        }
    }
}

impl FromStr for RulesetOperator {
    type Err = ComparisonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "and" | "AND" => Ok(Self::And),
            "or" | "OR" => Ok(Self::Or),
            other => Err(ComparisonError::InvalidOperator(other.to_string())),
        }
    }
}

/// Shipping effect attached to a ruleset. Only `type` and `guid` are known to
/// the engine; everything else is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub guid: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Action {
    pub fn new(action_type: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            action_type: action_type.into(),
            guid: new_guid(),
            fields,
        }
    }
}

/// A ruleset in its stored shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub conditions: Vec<ConditionRecord>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i64,
}

fn default_operator() -> String {
    RulesetOperator::And.as_str().to_string()
}

fn new_guid() -> String {
    Uuid::new_v4().to_string()
}

impl RulesetRecord {
    /// Give every condition and action without a guid a fresh one.
    pub fn assign_missing_guids(&mut self) {
        for condition in &mut self.conditions {
            if condition.guid.as_deref().is_none_or(str::is_empty) {
                condition.guid = Some(new_guid());
            }
        }
        for action in &mut self.actions {
            if action.guid.is_empty() {
                action.guid = new_guid();
            }
        }
    }

    /// Copy this ruleset under a new id. The copy starts disabled and every
    /// condition and action receives a new guid.
    pub fn duplicate(&self, new_id: impl Into<String>) -> RulesetRecord {
        let mut copy = self.clone();
        copy.id = new_id.into();
        copy.name = format!("{} (Clone)", self.name);
        copy.enabled = false;
        for condition in &mut copy.conditions {
            condition.guid = Some(new_guid());
        }
        for action in &mut copy.actions {
            action.guid = new_guid();
        }
        copy
    }
}

#[derive(Debug, Error)]
pub enum RulesetError {
    #[error("ruleset {id}: invalid operator '{operator}'")]
    InvalidOperator { id: String, operator: String },
    #[error("ruleset {0} has no conditions")]
    EmptyConditions(String),
    #[error("ruleset {id}: condition {index} is invalid: {source}")]
    Condition {
        id: String,
        index: usize,
        source: ConditionError,
    },
}

/// A validated ruleset ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    pub id: String,
    pub name: String,
    pub operator: RulesetOperator,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub enabled: bool,
}

impl Ruleset {
    pub fn from_record(record: &RulesetRecord) -> Result<Self, RulesetError> {
        let operator: RulesetOperator = record.operator.parse().map_err(|_| {
            RulesetError::InvalidOperator {
                id: record.id.clone(),
                operator: record.operator.clone(),
            }
        })?;

        if record.conditions.is_empty() {
            return Err(RulesetError::EmptyConditions(record.id.clone()));
        }

        let conditions = record
            .conditions
            .iter()
            .enumerate()
            .map(|(index, condition)| {
                parse_condition(condition).map_err(|source| RulesetError::Condition {
                    id: record.id.clone(),
                    index,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            operator,
            conditions,
            actions: record.actions.clone(),
            enabled: record.enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn sample_record() -> RulesetRecord {
        serde_json::from_value(json!({
            "id": "rs-1",
            "name": "Heavy parcels",
            "operator": "or",
            "enabled": true,
            "priority": 3,
            "conditions": [
                { "guid": "c-1", "type": "weight", "operator": "gt", "value": "30" },
                { "guid": "c-2", "type": "products", "operator": "in", "product_ids": [4, 5] }
            ],
            "actions": [
                { "type": "disable_shipping_methods", "guid": "a-1", "shipping_method_ids": ["7"] },
                { "type": "set_price", "guid": "a-2", "price": "9.90" }
            ]
        }))
        .expect("record")
    }

    #[test]
    fn record_defaults_to_and() {
        let record: RulesetRecord =
            serde_json::from_value(json!({"id": "x"})).expect("minimal record");
        assert_eq!(record.operator, "and");
        assert!(!record.enabled);
        assert!(record.conditions.is_empty());
    }

    #[test]
    fn action_payload_is_preserved() {
        let record = sample_record();
        let action = &record.actions[1];
        assert_eq!(action.action_type, "set_price");
        assert_eq!(action.fields.get("price"), Some(&json!("9.90")));

        let serialized = serde_json::to_value(action).expect("serialize");
        assert_eq!(
            serialized,
            json!({"type": "set_price", "guid": "a-2", "price": "9.90"})
        );
    }

    #[test]
    fn from_record_validates_conditions() {
        let ruleset = Ruleset::from_record(&sample_record()).expect("valid ruleset");
        assert_eq!(ruleset.operator, RulesetOperator::Or);
        assert_eq!(ruleset.conditions.len(), 2);
        assert_eq!(ruleset.actions.len(), 2);
        assert!(ruleset.enabled);
    }

    #[test]
    fn from_record_accepts_uppercase_operator() {
        let mut record = sample_record();
        record.operator = "AND".into();
        let ruleset = Ruleset::from_record(&record).expect("valid ruleset");
        assert_eq!(ruleset.operator, RulesetOperator::And);
    }

    #[test]
    fn ruleset_operator_parses_both_cases() {
        assert_eq!("and".parse::<RulesetOperator>(), Ok(RulesetOperator::And));
        assert_eq!("OR".parse::<RulesetOperator>(), Ok(RulesetOperator::Or));
        assert_eq!(
            "Or".parse::<RulesetOperator>(),
            Err(ComparisonError::InvalidOperator("Or".into()))
        );
    }

    #[test]
    fn from_record_rejects_unknown_operator() {
        let mut record = sample_record();
        record.operator = "xor".into();
        let err = Ruleset::from_record(&record).expect_err("bad operator");
        assert!(matches!(err, RulesetError::InvalidOperator { operator, .. } if operator == "xor"));
    }

    #[test]
    fn from_record_rejects_empty_conditions() {
        let mut record = sample_record();
        record.conditions.clear();
        let err = Ruleset::from_record(&record).expect_err("empty");
        assert!(matches!(err, RulesetError::EmptyConditions(id) if id == "rs-1"));
    }

    #[test]
    fn from_record_reports_condition_index() {
        let mut record = sample_record();
        record.conditions[1].operator = "sometimes".into();
        let err = Ruleset::from_record(&record).expect_err("bad condition");
        assert!(matches!(err, RulesetError::Condition { index: 1, .. }));
    }

    #[test]
    fn duplicate_regenerates_identifiers_only() {
        let original = sample_record();
        let copy = original.duplicate("rs-2");

        assert_eq!(copy.id, "rs-2");
        assert_eq!(copy.name, "Heavy parcels (Clone)");
        assert!(!copy.enabled);
        assert_eq!(copy.operator, original.operator);
        assert_eq!(copy.priority, original.priority);

        for (a, b) in original.conditions.iter().zip(&copy.conditions) {
            assert_ne!(a.guid, b.guid);
            let mut b = b.clone();
            b.guid = a.guid.clone();
            assert_eq!(a, &b);
        }
        for (a, b) in original.actions.iter().zip(&copy.actions) {
            assert_ne!(a.guid, b.guid);
            assert_eq!(a.action_type, b.action_type);
            assert_eq!(a.fields, b.fields);
        }
    }

    #[test]
    fn duplicates_never_share_identifiers() {
        let original = sample_record();
        let copies = [original.duplicate("rs-2"), original.duplicate("rs-3")];

        let mut seen = HashSet::new();
        for record in std::iter::once(&original).chain(copies.iter()) {
            for condition in &record.conditions {
                assert!(seen.insert(condition.guid.clone().expect("guid")));
            }
            for action in &record.actions {
                assert!(seen.insert(action.guid.clone()));
            }
        }
    }

    #[test]
    fn assign_missing_guids_keeps_existing() {
        let mut record = sample_record();
        record.conditions[0].guid = None;
        record.actions[1].guid.clear();

        record.assign_missing_guids();

        assert!(record.conditions[0].guid.as_deref().is_some_and(|g| !g.is_empty()));
        assert_eq!(record.conditions[1].guid.as_deref(), Some("c-2"));
        assert_eq!(record.actions[0].guid, "a-1");
        assert!(!record.actions[1].guid.is_empty());
    }
}

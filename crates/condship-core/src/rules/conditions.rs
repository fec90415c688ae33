use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::package::ProductId;

use super::operators::{ComparisonError, ComparisonOp, GroupOp};
use super::subset::SubsetFilter;

/// A condition as stored alongside its ruleset, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_ids: Vec<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal_includes_coupons: Option<bool>,
}

/// Physical package metrics a scalar condition can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Weight,
    #[serde(rename = "height_total")]
    Height,
    #[serde(rename = "length_total")]
    Length,
    #[serde(rename = "width_total")]
    Width,
    Volume,
}

impl Measure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Weight => "weight",
            Measure::Height => "height_total",
            Measure::Length => "length_total",
            Measure::Width => "width_total",
            Measure::Volume => "volume",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Measure {
        measure: Measure,
        op: ComparisonOp,
        value: Option<String>,
    },
    Subtotal {
        op: ComparisonOp,
        value: Option<String>,
        includes_coupons: bool,
    },
    Products {
        op: GroupOp,
        product_ids: Vec<ProductId>,
    },
}

/// A validated condition. Operators and subset filters are closed enums, so
/// the only failure left for evaluation time is a non-numeric value.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub guid: Option<String>,
    pub predicate: Predicate,
    pub subset: Option<SubsetFilter>,
}

impl Condition {
    pub fn type_name(&self) -> &'static str {
        match &self.predicate {
            Predicate::Measure { measure, .. } => measure.as_str(),
            Predicate::Subtotal { .. } => "subtotal",
            Predicate::Products { .. } => "products",
        }
    }

    pub fn to_record(&self) -> ConditionRecord {
        let mut record = ConditionRecord {
            guid: self.guid.clone(),
            condition_type: self.type_name().to_string(),
            operator: String::new(),
            value: None,
            product_ids: Vec::new(),
            subset_filter: self.subset.map(|filter| filter.to_string()),
            subtotal_includes_coupons: None,
        };

        match &self.predicate {
            Predicate::Measure { op, value, .. } => {
                record.operator = op.as_str().to_string();
                record.value = value.clone();
            }
            Predicate::Subtotal {
                op,
                value,
                includes_coupons,
            } => {
                record.operator = op.as_str().to_string();
                record.value = value.clone();
                record.subtotal_includes_coupons = Some(*includes_coupons);
            }
            Predicate::Products { op, product_ids } => {
                record.operator = op.as_str().to_string();
                record.product_ids = product_ids.clone();
            }
        }

        record
    }
}

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("invalid condition json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown condition type '{0}'")]
    UnknownType(String),
    #[error("{0}")]
    Comparison(#[from] ComparisonError),
    #[error("unknown subset filter '{0}'")]
    UnknownSubsetFilter(String),
}

pub fn parse_condition(record: &ConditionRecord) -> Result<Condition, ConditionError> {
    let subset = match record.subset_filter.as_deref() {
        None | Some("") => None,
        Some(tag) => Some(
            SubsetFilter::parse(tag)
                .ok_or_else(|| ConditionError::UnknownSubsetFilter(tag.to_string()))?,
        ),
    };

    let measure = match record.condition_type.as_str() {
        "weight" => Some(Measure::Weight),
        "height_total" => Some(Measure::Height),
        "length_total" => Some(Measure::Length),
        "width_total" => Some(Measure::Width),
        "volume" => Some(Measure::Volume),
        _ => None,
    };

    let predicate = match (measure, record.condition_type.as_str()) {
        (Some(measure), _) => Predicate::Measure {
            measure,
            op: record.operator.parse()?,
            value: record.value.clone(),
        },
        (None, "subtotal") => Predicate::Subtotal {
            op: record.operator.parse()?,
            value: record.value.clone(),
            includes_coupons: record.subtotal_includes_coupons.unwrap_or(false),
        },
        (None, "products") => Predicate::Products {
            op: record.operator.parse()?,
            product_ids: record.product_ids.clone(),
        },
        (None, other) => return Err(ConditionError::UnknownType(other.to_string())),
    };

    Ok(Condition {
        guid: record.guid.clone(),
        predicate,
        subset,
    })
}

pub fn parse_condition_json(value: &Value) -> Result<Condition, ConditionError> {
    let record: ConditionRecord = serde_json::from_value(value.clone())?;
    parse_condition(&record)
}

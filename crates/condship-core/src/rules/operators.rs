use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::package::ProductId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComparisonError {
    #[error("invalid operator '{0}'")]
    InvalidOperator(String),
    #[error("value '{0}' is not a number")]
    Parse(String),
}

/// Scalar comparators: `e`, `gt`, `gte`, `lt`, `lte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "e")]
    Equal,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterOrEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessOrEqual,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "e",
            ComparisonOp::GreaterThan => "gt",
            ComparisonOp::GreaterOrEqual => "gte",
            ComparisonOp::LessThan => "lt",
            ComparisonOp::LessOrEqual => "lte",
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = ComparisonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "e" => Ok(Self::Equal),
            "gt" => Ok(Self::GreaterThan),
            "gte" => Ok(Self::GreaterOrEqual),
            "lt" => Ok(Self::LessThan),
            "lte" => Ok(Self::LessOrEqual),
            other => Err(ComparisonError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set-inclusion policies for product conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOp {
    /// At least one configured id is observed.
    In,
    /// No configured id is observed.
    #[serde(rename = "notin")]
    NotIn,
    /// Everything observed is configured.
    Exclusive,
    /// Everything configured is observed.
    #[serde(rename = "allin")]
    AllIn,
}

impl GroupOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOp::In => "in",
            GroupOp::NotIn => "notin",
            GroupOp::Exclusive => "exclusive",
            GroupOp::AllIn => "allin",
        }
    }
}

impl FromStr for GroupOp {
    type Err = ComparisonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in" => Ok(Self::In),
            "notin" => Ok(Self::NotIn),
            "exclusive" => Ok(Self::Exclusive),
            "allin" => Ok(Self::AllIn),
            other => Err(ComparisonError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for GroupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a user-entered number, accepting a decimal comma.
///
/// Only plain decimal notation (optional sign, digits, one point, optional
/// exponent) is accepted; `inf`, `NaN` and hex literals are rejected.
pub fn parse_number(raw: &str) -> Result<f64, ComparisonError> {
    let normalized = raw.replace(',', ".");
    let trimmed = normalized.trim();

    let looks_numeric = trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'));
    if !looks_numeric {
        return Err(ComparisonError::Parse(raw.to_string()));
    }

    trimmed
        .parse::<f64>()
        .map_err(|_| ComparisonError::Parse(raw.to_string()))
}

pub fn compare(a: f64, b: f64, op: ComparisonOp) -> bool {
    match op {
        ComparisonOp::Equal => a == b,
        ComparisonOp::GreaterThan => a > b,
        ComparisonOp::GreaterOrEqual => a >= b,
        ComparisonOp::LessThan => a < b,
        ComparisonOp::LessOrEqual => a <= b,
    }
}

/// [`compare`] with an operator that has not been validated yet.
pub fn compare_str(a: f64, b: f64, op: &str) -> Result<bool, ComparisonError> {
    Ok(compare(a, b, op.parse()?))
}

pub fn group_compare<O, C>(observed: O, configured: C, op: GroupOp) -> bool
where
    O: IntoIterator<Item = ProductId>,
    C: IntoIterator<Item = ProductId>,
{
    let observed: BTreeSet<ProductId> = observed.into_iter().collect();
    let configured: BTreeSet<ProductId> = configured.into_iter().collect();

    match op {
        GroupOp::In => !observed.is_disjoint(&configured),
        GroupOp::NotIn => observed.is_disjoint(&configured),
        GroupOp::Exclusive => observed.is_subset(&configured),
        GroupOp::AllIn => observed.is_superset(&configured),
    }
}

/// [`group_compare`] with an operator that has not been validated yet.
pub fn group_compare_str<O, C>(
    observed: O,
    configured: C,
    op: &str,
) -> Result<bool, ComparisonError>
where
    O: IntoIterator<Item = ProductId>,
    C: IntoIterator<Item = ProductId>,
{
    Ok(group_compare(observed, configured, op.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_accepts_decimal_comma() {
        assert_eq!(parse_number("3,5"), Ok(3.5));
        assert_eq!(parse_number("3.5"), Ok(3.5));
        assert_eq!(parse_number(" 12 "), Ok(12.0));
        assert_eq!(parse_number("-2"), Ok(-2.0));
        assert_eq!(parse_number("1e3"), Ok(1000.0));
        assert_eq!(parse_number(".5"), Ok(0.5));
    }

    #[test]
    fn parse_number_rejects_non_numeric() {
        for raw in ["abc", "", "  ", "inf", "NaN", "0x10", "1,2,3", "5kg", "e"] {
            assert_eq!(
                parse_number(raw),
                Err(ComparisonError::Parse(raw.to_string())),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn compare_operators() {
        assert!(compare(5.0, 5.0, ComparisonOp::Equal));
        assert!(compare(5.0, 5.0, ComparisonOp::GreaterOrEqual));
        assert!(!compare(4.0, 5.0, ComparisonOp::GreaterThan));
        assert!(compare(6.0, 5.0, ComparisonOp::GreaterThan));
        assert!(compare(4.0, 5.0, ComparisonOp::LessThan));
        assert!(!compare(5.0, 5.0, ComparisonOp::LessThan));
        assert!(compare(5.0, 5.0, ComparisonOp::LessOrEqual));
        assert!(!compare(5.1, 5.0, ComparisonOp::LessOrEqual));
    }

    #[test]
    fn compare_str_rejects_unknown_operator() {
        assert_eq!(compare_str(5.0, 5.0, "gte"), Ok(true));
        assert_eq!(
            compare_str(5.0, 5.0, "neq"),
            Err(ComparisonError::InvalidOperator("neq".into()))
        );
    }

    #[test]
    fn operator_round_trips_through_str() {
        for op in ["e", "gt", "gte", "lt", "lte"] {
            let parsed: ComparisonOp = op.parse().expect("valid operator");
            assert_eq!(parsed.as_str(), op);
        }
        for op in ["in", "notin", "exclusive", "allin"] {
            let parsed: GroupOp = op.parse().expect("valid operator");
            assert_eq!(parsed.to_string(), op);
        }
    }

    #[test]
    fn group_compare_policies() {
        assert!(!group_compare([1, 2], [1, 2, 3], GroupOp::AllIn));
        assert!(group_compare([1, 2, 3], [1, 2], GroupOp::AllIn));
        assert!(group_compare([1, 2], [1, 2, 3], GroupOp::Exclusive));
        assert!(!group_compare([1, 2, 3], [1, 2], GroupOp::Exclusive));
        assert!(!group_compare([1, 2], [3, 4], GroupOp::In));
        assert!(group_compare([1, 2], [2, 4], GroupOp::In));
        assert!(group_compare([1, 2], [3, 4], GroupOp::NotIn));
        assert!(!group_compare([1, 2], [2, 4], GroupOp::NotIn));
    }

    #[test]
    fn group_compare_ignores_duplicates() {
        assert!(group_compare([1, 1, 2], [2, 2, 1], GroupOp::AllIn));
        assert!(group_compare([1, 1, 2], [2, 2, 1], GroupOp::Exclusive));
    }

    #[test]
    fn group_compare_str_rejects_unknown_operator() {
        assert_eq!(
            group_compare_str([1], [1], "contains"),
            Err(ComparisonError::InvalidOperator("contains".into()))
        );
    }
}

pub mod aggregate;
pub mod conditions;
pub mod evaluator;
pub mod health;
pub mod loader;
pub mod operators;
pub mod subset;
pub mod types;

pub use conditions::{
    Condition, ConditionError, ConditionRecord, Measure, Predicate, parse_condition,
    parse_condition_json,
};
pub use evaluator::{
    ConditionOutcome, EMPTY_WEIGHT_SENTINEL, Evaluator, RulesetOutcome, evaluate, matched_actions,
};
pub use health::overlapping_enables;
pub use loader::{
    ExecutorError, InMemoryRulesetStore, RuleExecutor, RulesetLoader, RulesetLoaderError,
    RulesetSource, StoreError,
};
pub use operators::{
    ComparisonError, ComparisonOp, GroupOp, compare, compare_str, group_compare,
    group_compare_str, parse_number,
};
pub use subset::{SubsetFilter, in_subset};
pub use types::{Action, Ruleset, RulesetError, RulesetOperator, RulesetRecord};

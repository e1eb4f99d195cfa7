//! # Operators
//!
//! The closed operator set of the condition language: eighteen leaf
//! operators plus the three logical ones.

use serde::{Deserialize, Serialize};

use crate::error::{ConditionError, ConditionResult};

/// Leaf operator comparing one context field against an operand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    // Comparison
    /// Direct equality, no coercion.
    Equals,
    /// Negation of `Equals`.
    NotEquals,
    /// Numeric `>`; a falsy field counts as 0.
    GreaterThan,
    /// Numeric `<`; a falsy field counts as 0.
    LessThan,
    /// Numeric `>=`; a falsy field counts as 0.
    GreaterEqual,
    /// Numeric `<=`; a falsy field counts as 0.
    LessEqual,

    // String
    /// Case-insensitive substring test.
    Contains,
    /// Case-insensitive prefix test.
    StartsWith,
    /// Case-insensitive suffix test.
    EndsWith,
    /// Regular expression anchored at the start of the field.
    MatchesPattern,

    // Collection
    /// Field is a member of the operand list.
    In,
    /// Field is not a member of the operand list.
    NotIn,
    /// Field list and operand list intersect.
    AnyOf,
    /// Operand list is a subset of the field list.
    AllOf,

    // Existence
    /// Field is present, not null and not the empty string.
    Exists,
    /// Negation of `Exists`.
    NotExists,
    /// Field is falsy.
    IsEmpty,
    /// Negation of `IsEmpty`.
    IsNotEmpty,
}

impl Operator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterEqual => "greater_equal",
            Operator::LessEqual => "less_equal",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::MatchesPattern => "matches_pattern",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::AnyOf => "any_of",
            Operator::AllOf => "all_of",
            Operator::Exists => "exists",
            Operator::NotExists => "not_exists",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
        }
    }

    /// Parse a leaf operator from its wire name (exact match).
    ///
    /// # Errors
    ///
    /// [`ConditionError::UnknownOperator`] for any other name, including the
    /// logical operators.
    pub fn parse(s: &str) -> ConditionResult<Self> {
        let op = match s {
            "equals" => Operator::Equals,
            "not_equals" => Operator::NotEquals,
            "greater_than" => Operator::GreaterThan,
            "less_than" => Operator::LessThan,
            "greater_equal" => Operator::GreaterEqual,
            "less_equal" => Operator::LessEqual,
            "contains" => Operator::Contains,
            "starts_with" => Operator::StartsWith,
            "ends_with" => Operator::EndsWith,
            "matches_pattern" => Operator::MatchesPattern,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "any_of" => Operator::AnyOf,
            "all_of" => Operator::AllOf,
            "exists" => Operator::Exists,
            "not_exists" => Operator::NotExists,
            "is_empty" => Operator::IsEmpty,
            "is_not_empty" => Operator::IsNotEmpty,
            other => return Err(ConditionError::UnknownOperator(other.to_string())),
        };
        Ok(op)
    }

    /// Get all leaf operators.
    pub fn all() -> Vec<Self> {
        vec![
            Operator::Equals,
            Operator::NotEquals,
            Operator::GreaterThan,
            Operator::LessThan,
            Operator::GreaterEqual,
            Operator::LessEqual,
            Operator::Contains,
            Operator::StartsWith,
            Operator::EndsWith,
            Operator::MatchesPattern,
            Operator::In,
            Operator::NotIn,
            Operator::AnyOf,
            Operator::AllOf,
            Operator::Exists,
            Operator::NotExists,
            Operator::IsEmpty,
            Operator::IsNotEmpty,
        ]
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire name of the conjunction.
pub const AND: &str = "and";
/// Wire name of the disjunction.
pub const OR: &str = "or";
/// Wire name of the negation.
pub const NOT: &str = "not";

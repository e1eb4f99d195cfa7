//! # Condition evaluation
//!
//! Pure evaluation of a [`Condition`] against a JSON context. Evaluation
//! reads nothing but its two arguments, so repeated calls with the same
//! inputs always agree.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use crate::condition::Condition;
use crate::context::resolve_field;
use crate::error::ConditionResult;
use crate::operator::Operator;
use crate::value::{as_list, compare, contains_loosely, display_string, is_truthy, loose_eq};

/// Evaluates display conditions against form contexts.
///
/// # Example
///
/// ```
/// use configurator_conditions::ConditionEvaluator;
/// use serde_json::json;
///
/// let evaluator = ConditionEvaluator::new();
/// let condition = json!({"operator": "contains", "field": "opening_system", "value": "slid"});
///
/// assert!(evaluator.evaluate_json(&condition, &json!({"opening_system": "Sliding"})).unwrap());
/// assert!(!evaluator.evaluate_json(&condition, &json!({"opening_system": "Casement"})).unwrap());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a parsed condition.
    ///
    /// `and` and `or` evaluate every child before combining, so an empty
    /// `and` is true and an empty `or` is false.
    pub fn evaluate(&self, condition: &Condition, context: &Value) -> bool {
        match condition {
            Condition::Always => true,
            Condition::Leaf {
                operator,
                field,
                value,
            } => {
                let field_value = field
                    .as_deref()
                    .and_then(|path| resolve_field(context, path));
                self.evaluate_leaf(*operator, field_value, value)
            }
            Condition::And(children) => children
                .iter()
                .map(|child| self.evaluate(child, context))
                .fold(true, |acc, result| acc & result),
            Condition::Or(children) => children
                .iter()
                .map(|child| self.evaluate(child, context))
                .fold(false, |acc, result| acc | result),
            Condition::Not(child) => !self.evaluate(child, context),
        }
    }

    /// Parse a wire-format condition and evaluate it.
    ///
    /// # Errors
    ///
    /// [`crate::ConditionError::UnknownOperator`] when any node names an
    /// unknown operator.
    pub fn evaluate_json(&self, condition: &Value, context: &Value) -> ConditionResult<bool> {
        let condition = Condition::from_value(condition)?;
        Ok(self.evaluate(&condition, context))
    }

    fn evaluate_leaf(&self, operator: Operator, field: Option<&Value>, operand: &Value) -> bool {
        let value = field.unwrap_or(&Value::Null);

        match operator {
            Operator::Equals => loose_eq(value, operand),
            Operator::NotEquals => !loose_eq(value, operand),
            Operator::GreaterThan => compare(value, operand) == Some(Ordering::Greater),
            Operator::LessThan => compare(value, operand) == Some(Ordering::Less),
            Operator::GreaterEqual => matches!(
                compare(value, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::LessEqual => matches!(
                compare(value, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),

            Operator::Contains => lowered(value).contains(&lowered(operand)),
            Operator::StartsWith => lowered(value).starts_with(&lowered(operand)),
            Operator::EndsWith => lowered(value).ends_with(&lowered(operand)),
            Operator::MatchesPattern => matches_at_start(&display_string(operand), &display_string(value)),

            Operator::In => as_list(operand).into_iter().any(|item| loose_eq(item, value)),
            Operator::NotIn => !as_list(operand).into_iter().any(|item| loose_eq(item, value)),
            Operator::AnyOf => match operand {
                Value::Array(wanted) => {
                    let have = as_list(value);
                    wanted.iter().any(|w| have.iter().any(|h| loose_eq(h, w)))
                }
                _ => false,
            },
            Operator::AllOf => match operand {
                Value::Array(wanted) => match value {
                    Value::Array(have) => wanted.iter().all(|w| contains_loosely(have, w)),
                    single => wanted.iter().all(|w| loose_eq(single, w)),
                },
                _ => false,
            },

            Operator::Exists => exists(field),
            Operator::NotExists => !exists(field),
            Operator::IsEmpty => !is_truthy(value),
            Operator::IsNotEmpty => is_truthy(value),
        }
    }
}

fn exists(field: Option<&Value>) -> bool {
    match field {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn lowered(value: &Value) -> String {
    display_string(value).to_lowercase()
}

fn matches_at_start(pattern: &str, text: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.find(text).map_or(false, |m| m.start() == 0),
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid pattern in display condition");
            false
        }
    }
}

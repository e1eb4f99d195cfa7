//! # Condition AST
//!
//! Typed form of the `display_condition` JSON stored in attribute metadata:
//!
//! ```text
//! {"operator": "equals", "field": "type", "value": "Frame"}
//! {"operator": "and", "conditions": [ ... ]}
//! {"operator": "not", "condition": { ... }}
//! ```
//!
//! The wire shape has no version field and is shared with a second,
//! independent evaluator, so parsing and serialization must preserve it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConditionResult;
use crate::operator::{Operator, AND, NOT, OR};

/// Parsed condition expression.
///
/// Parsing is lenient about absent parts and strict about operator names:
/// - `null`, non-objects, `{}` and objects without an operator become [`Condition::Always`]
/// - missing `conditions` is an empty list, missing `condition` is `Always`
/// - an unknown operator anywhere in the tree fails the whole parse
///
/// # Example
///
/// ```
/// use configurator_conditions::{Condition, Operator};
/// use serde_json::json;
///
/// let condition = Condition::try_from(json!({
///     "operator": "and",
///     "conditions": [
///         {"operator": "equals", "field": "type", "value": "Frame"},
///         {"operator": "not", "condition": {"operator": "is_empty", "field": "width"}}
///     ]
/// }))
/// .unwrap();
///
/// assert_eq!(condition.depth(), 3);
/// assert!(Condition::try_from(json!({"operator": "between"})).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Condition {
    /// No condition: always visible.
    #[default]
    Always,
    /// Field comparison.
    Leaf {
        /// Leaf operator.
        operator: Operator,
        /// Dot-separated field path; `None` when the node names no field.
        field: Option<String>,
        /// Right-hand operand (`null` when absent).
        value: Value,
    },
    /// All children hold.
    And(Vec<Condition>),
    /// At least one child holds.
    Or(Vec<Condition>),
    /// The child does not hold.
    Not(Box<Condition>),
}

impl Condition {
    /// Build a leaf node.
    pub fn leaf(operator: Operator, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Leaf {
            operator,
            field: Some(field.into()),
            value: value.into(),
        }
    }

    /// Build a negation.
    pub fn negate(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Parse a condition from a JSON value.
    ///
    /// # Errors
    ///
    /// [`crate::ConditionError::UnknownOperator`] if any node names an unknown operator.
    pub fn from_value(value: &Value) -> ConditionResult<Self> {
        let Value::Object(node) = value else {
            return Ok(Condition::Always);
        };

        let name = match node.get("operator") {
            None | Some(Value::Null) => return Ok(Condition::Always),
            Some(Value::String(name)) if name.is_empty() => return Ok(Condition::Always),
            Some(Value::String(name)) => name.as_str(),
            Some(other) => {
                return Err(crate::ConditionError::UnknownOperator(other.to_string()))
            }
        };

        match name {
            AND => Ok(Condition::And(parse_children(node)?)),
            OR => Ok(Condition::Or(parse_children(node)?)),
            NOT => {
                let child = match node.get("condition") {
                    Some(child) => Self::from_value(child)?,
                    None => Condition::Always,
                };
                Ok(Condition::negate(child))
            }
            leaf => Ok(Condition::Leaf {
                operator: Operator::parse(leaf)?,
                field: node.get("field").and_then(Value::as_str).map(str::to_string),
                value: node.get("value").cloned().unwrap_or(Value::Null),
            }),
        }
    }

    /// Parse a condition from JSON text.
    ///
    /// # Errors
    ///
    /// [`crate::ConditionError::InvalidJson`] for malformed text, otherwise as [`Condition::from_value`].
    pub fn parse_str(json: &str) -> ConditionResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Nesting depth; `Always` and leaves have depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Condition::Always | Condition::Leaf { .. } => 1,
            Condition::And(children) | Condition::Or(children) => {
                1 + children.iter().map(Condition::depth).max().unwrap_or(0)
            }
            Condition::Not(child) => 1 + child.depth(),
        }
    }

    /// Render the condition in its wire shape.
    pub fn to_value(&self) -> Value {
        match self {
            Condition::Always => Value::Null,
            Condition::Leaf {
                operator,
                field,
                value,
            } => {
                let mut node = Map::new();
                node.insert("operator".into(), Value::String(operator.as_str().into()));
                if let Some(field) = field {
                    node.insert("field".into(), Value::String(field.clone()));
                }
                if !value.is_null() {
                    node.insert("value".into(), value.clone());
                }
                Value::Object(node)
            }
            Condition::And(children) => logical(AND, children),
            Condition::Or(children) => logical(OR, children),
            Condition::Not(child) => {
                let mut node = Map::new();
                node.insert("operator".into(), Value::String(NOT.into()));
                node.insert("condition".into(), child.to_value());
                Value::Object(node)
            }
        }
    }
}

fn parse_children(node: &Map<String, Value>) -> ConditionResult<Vec<Condition>> {
    match node.get("conditions") {
        Some(Value::Array(children)) => children.iter().map(Condition::from_value).collect(),
        _ => Ok(Vec::new()),
    }
}

fn logical(operator: &str, children: &[Condition]) -> Value {
    let mut node = Map::new();
    node.insert("operator".into(), Value::String(operator.into()));
    node.insert(
        "conditions".into(),
        Value::Array(children.iter().map(Condition::to_value).collect()),
    );
    Value::Object(node)
}

impl TryFrom<Value> for Condition {
    type Error = crate::ConditionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Condition::from_value(&value)
    }
}

impl From<&Condition> for Value {
    fn from(condition: &Condition) -> Self {
        condition.to_value()
    }
}

impl From<Condition> for Value {
    fn from(condition: Condition) -> Self {
        condition.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConditionError;
    use serde_json::json;

    #[test]
    fn test_absent_conditions_are_always() {
        for raw in [
            Value::Null,
            json!({}),
            json!({"operator": null}),
            json!({"operator": ""}),
            json!({"field": "width", "value": 3}),
            json!("equals"),
            json!([1, 2]),
        ] {
            assert_eq!(Condition::from_value(&raw).unwrap(), Condition::Always, "{raw}");
        }
    }

    #[test]
    fn test_parse_leaf() {
        let condition =
            Condition::from_value(&json!({"operator": "equals", "field": "type", "value": "Frame"}))
                .unwrap();
        assert_eq!(condition, Condition::leaf(Operator::Equals, "type", "Frame"));
    }

    #[test]
    fn test_parse_leaf_without_value() {
        let condition =
            Condition::from_value(&json!({"operator": "exists", "field": "glazing"})).unwrap();
        assert_eq!(
            condition,
            Condition::Leaf {
                operator: Operator::Exists,
                field: Some("glazing".to_string()),
                value: Value::Null,
            }
        );
    }

    #[test]
    fn test_parse_logical_defaults() {
        assert_eq!(
            Condition::from_value(&json!({"operator": "and"})).unwrap(),
            Condition::And(vec![])
        );
        assert_eq!(
            Condition::from_value(&json!({"operator": "or", "conditions": "nope"})).unwrap(),
            Condition::Or(vec![])
        );
        assert_eq!(
            Condition::from_value(&json!({"operator": "not"})).unwrap(),
            Condition::negate(Condition::Always)
        );
    }

    #[test]
    fn test_unknown_operator_anywhere_fails() {
        let raw = json!({
            "operator": "or",
            "conditions": [
                {"operator": "equals", "field": "a", "value": 1},
                {"operator": "not", "condition": {"operator": "sounds_like", "field": "a"}}
            ]
        });
        assert_eq!(
            Condition::from_value(&raw),
            Err(ConditionError::UnknownOperator("sounds_like".to_string()))
        );
    }

    #[test]
    fn test_non_string_operator_is_unknown() {
        assert_eq!(
            Condition::from_value(&json!({"operator": 5})),
            Err(ConditionError::UnknownOperator("5".to_string()))
        );
    }

    #[test]
    fn test_wire_shape_round_trip() {
        let raw = json!({
            "operator": "and",
            "conditions": [
                {"operator": "in", "field": "frame.material", "value": ["pvc", "alu"]},
                {"operator": "not", "condition": {"operator": "is_empty", "field": "width"}}
            ]
        });
        let condition = Condition::from_value(&raw).unwrap();
        assert_eq!(condition.to_value(), raw);
    }

    #[test]
    fn test_serde_uses_wire_shape() {
        let condition: Condition =
            serde_json::from_str(r#"{"operator":"contains","field":"name","value":"slid"}"#).unwrap();
        assert_eq!(condition, Condition::leaf(Operator::Contains, "name", "slid"));

        let rendered = serde_json::to_value(&condition).unwrap();
        assert_eq!(rendered, json!({"operator": "contains", "field": "name", "value": "slid"}));

        let err = serde_json::from_str::<Condition>(r#"{"operator":"near"}"#).unwrap_err();
        assert!(err.to_string().contains("Unknown operator: near"));
    }

    #[test]
    fn test_parse_str_invalid_json() {
        assert!(matches!(
            Condition::parse_str("{not json"),
            Err(ConditionError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_depth() {
        let mut condition = Condition::leaf(Operator::Exists, "a", Value::Null);
        for _ in 0..9 {
            condition = Condition::negate(condition);
        }
        assert_eq!(condition.depth(), 10);
    }
}

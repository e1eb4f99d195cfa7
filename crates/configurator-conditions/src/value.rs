//! Value semantics shared by every operator.
//!
//! Form payloads arrive as loosely typed JSON, so the operators agree on one
//! notion of truthiness, equality, string rendering and ordering. Any second
//! evaluator has to reproduce exactly these rules.

use std::cmp::Ordering;

use serde_json::Value;

/// Truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Equality across JSON types.
///
/// Numbers compare by value (`1 == 1.0`), booleans equal `1`/`0`, and
/// containers compare element-wise under the same rules.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).map_or(false, |y| loose_eq(x, y)))
        }
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
        (Value::Bool(_) | Value::Number(_), Value::Bool(_) | Value::Number(_)) => {
            as_number(left) == as_number(right)
        }
        _ => false,
    }
}

/// Render a value the way string operators see it.
///
/// `null` renders as the empty string; booleans render as `True`/`False`
/// and whole floats keep their fractional part (`2.0`).
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                let f = n.as_f64().unwrap_or_default();
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Membership under [`loose_eq`].
pub fn contains_loosely(haystack: &[Value], needle: &Value) -> bool {
    haystack.iter().any(|item| loose_eq(item, needle))
}

/// View a value as a list: arrays as-is, anything else as a single element.
pub fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Order a field against an operand for the numeric comparison operators.
///
/// A falsy field counts as `0`. Numbers, booleans and numeric strings compare
/// numerically, two non-numeric strings compare lexicographically. Anything
/// else is not comparable and yields `None`.
pub fn compare(field: &Value, operand: &Value) -> Option<Ordering> {
    let left = if is_truthy(field) {
        Comparable::of(field)?
    } else {
        Comparable::Number(0.0)
    };
    let right = Comparable::of(operand)?;

    match (left, right) {
        (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(&b),
        (Comparable::Text(a), Comparable::Text(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

enum Comparable<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> Comparable<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Comparable::Number(f),
                _ => Comparable::Text(s),
            }),
            other => as_number(other).map(Comparable::Number),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

//! Golden parity vectors.
//!
//! Every evaluator of display conditions (this crate and the form client)
//! must produce the listed outcome for every vector. The file is embedded so
//! other consumers can export it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConditionResult;

const VECTORS: &str = include_str!("../vectors/condition_vectors.json");

/// Expected outcome of one vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expectation {
    /// Evaluation returns this boolean.
    Result(bool),
    /// Evaluation fails with this message.
    Error {
        /// Rendered error message.
        error: String,
    },
}

impl Expectation {
    /// Check an actual outcome against the expectation.
    pub fn is_met_by(&self, outcome: &ConditionResult<bool>) -> bool {
        match (self, outcome) {
            (Expectation::Result(expected), Ok(actual)) => expected == actual,
            (Expectation::Error { error }, Err(actual)) => *error == actual.to_string(),
            _ => false,
        }
    }
}

/// One (condition, context, expected) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenVector {
    /// Short description.
    pub name: String,
    /// Condition in wire format.
    pub condition: Value,
    /// Evaluation context.
    pub context: Value,
    /// Expected outcome.
    pub expected: Expectation,
}

/// Raw JSON text of the vector suite.
pub fn golden_vectors_json() -> &'static str {
    VECTORS
}

/// Parsed vector suite.
///
/// # Errors
///
/// [`crate::ConditionError::InvalidJson`] if the embedded file is malformed.
pub fn golden_vectors() -> ConditionResult<Vec<GoldenVector>> {
    Ok(serde_json::from_str(VECTORS)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConditionError;

    #[test]
    fn test_vectors_parse() {
        let vectors = golden_vectors().unwrap();
        assert!(vectors.len() > 50);
        assert!(vectors
            .iter()
            .any(|v| matches!(v.expected, Expectation::Error { .. })));
    }

    #[test]
    fn test_expectation_matching() {
        assert!(Expectation::Result(true).is_met_by(&Ok(true)));
        assert!(!Expectation::Result(true).is_met_by(&Ok(false)));
        let err = Err(ConditionError::UnknownOperator("x".into()));
        assert!(Expectation::Error { error: "Unknown operator: x".into() }.is_met_by(&err));
        assert!(!Expectation::Result(false).is_met_by(&err));
    }
}
